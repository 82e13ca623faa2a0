//! Template bodies. Placeholders are `{snake_case}` names; other braces are literal.

/// Registry parameter reference given to the model when it writes a query.
pub(super) const REGISTRY_PARAMETERS: &str = r#"### Query parameters
- **query.cond**: "Conditions or disease" query in Essie expression syntax. Searches the `ConditionSearch` area.
  Examples: `lung cancer`, `(head OR neck) AND pain`
- **query.term**: "Other terms" query in Essie expression syntax. Searches the `BasicSearch` area.
  Example: `AREA[LastUpdatePostDate]RANGE[2023-01-15,MAX]`
- **query.locn**: "Location terms" query in Essie expression syntax. Searches the `LocationSearch` area.
- **query.titles**: "Title / acronym" query in Essie expression syntax. Searches the `TitleSearch` area.
- **query.intr**: "Intervention / treatment" query in Essie expression syntax. Searches the `InterventionSearch` area.
- **query.outc**: "Outcome measure" query in Essie expression syntax. Searches the `OutcomeSearch` area.
- **query.spons**: "Sponsor / collaborator" query in Essie expression syntax. Searches the `SponsorSearch` area.
- **query.lead**: Searches the `LeadSponsorName` field.
- **query.id**: "Study IDs" query in Essie expression syntax. Searches the `IdSearch` area.
- **query.patient**: Searches the `PatientSearch` area.

### Filter parameters
- **filter.overallStatus**: list of statuses. Allowed values:
  ACTIVE_NOT_RECRUITING, COMPLETED, ENROLLING_BY_INVITATION, NOT_YET_RECRUITING,
  RECRUITING, SUSPENDED, TERMINATED, WITHDRAWN, AVAILABLE, NO_LONGER_AVAILABLE,
  TEMPORARILY_NOT_AVAILABLE, APPROVED_FOR_MARKETING, WITHHELD, UNKNOWN
  Examples: `["NOT_YET_RECRUITING", "RECRUITING"]`, `"COMPLETED"`
- **filter.geo**: geographic filter using the `distance` function.
  Example: `distance(39.0035707,-77.1013313,50mi)`
- **filter.ids**: list of NCT IDs. Example: `["NCT04852770", "NCT01728545"]`
- **filter.advanced**: filter by an Essie expression.
  Examples: `AREA[StartDate]2022`, `AREA[MinimumAge]RANGE[MIN, 16 years] AND AREA[MaximumAge]RANGE[16 years, MAX]`
- **filter.synonyms**: list of area:synonym_id pairs. Example: `["ConditionSearch:1651367"]`

### Sort parameters
- **sort**: list of sort options. Examples: `["@relevance"]`, `["LastUpdatePostDate"]`, `["EnrollmentCount:desc", "NumArmGroups"]`
  Sorting by `@relevance`, date fields, or numeric fields is supported. Date fields and `@relevance`
  sort descending by default, numeric fields ascending.

### Other parameters
- **markupFormat**: `markdown` (default) or `legacy`.
- **countTotal**: `true` or `false`.
- **pageSize**: studies per page, default 10, maximum 1000.

### Notes
- `filter.lastUpdatePostDate` does not exist. Use `filter.advanced` with an Essie expression,
  for example `AREA[LastUpdatePostDate]RANGE[2023-01-15,MAX]`."#;

pub(super) const QUERY_SYSTEM: &str = r#"You are an academic professional in the life sciences.
Write the parameters of a ClinicalTrials.gov API request as a single JSON object, following <output_example>.
The JSON is consumed by a program: output the object only, with no explanation or code fences.

<api-document>
@PARAMETERS@
</api-document>

<output_example>
{
  "query.cond": "(type 2 diabetes)",
  "query.intr": "(DPP4 inhibitor) AND (SGLT2 inhibitor)",
  "filter.overallStatus": "COMPLETED",
  "filter.advanced": "AREA[Phase]PHASE3",
  "sort": ["LastUpdatePostDate:desc"]
}
</output_example>

<rules>
* Write every search term in English, translating the input when it is in another language.
* Never use the `fields` parameter.
* Do not add date ranges; the system applies them separately.
</rules>"#;

pub(super) const QUERY_USER: &str = r#"# Clinical trial search

I am looking for clinical trials relevant to the following clinical question.

## Search fields
Each XML tag means:
- `<patient>`: characteristics of the target patients
- `<intervention>`: treatment or administration being studied
- `<comparison>`: comparator
- `<outcome>`: outcome or measure being evaluated
- `<additional_condition>`: any other condition (never date ranges)

## Criteria
<patient>{patient}</patient>
<intervention>{intervention}</intervention>
<comparison>{comparison}</comparison>
<outcome>{outcome}</outcome>
<additional_condition>{additional_condition}</additional_condition>

## Notes
* When two drugs or drug classes are compared, include both in `query.intr` joined with AND.
* Spaces inside query strings need no escaping."#;

pub(super) const OVERVIEW: &str = r#"# Clinical trial overview
Studies analysed: {num_studies}

## Population
{patient}

### Main interventions (top 5)
{interventions}

### Main eligibility criteria (top 5)
{eligibility}

## Outcomes
### Primary outcomes (top 5)
{primary_outcomes}

### Secondary outcomes (top 5)
{secondary_outcomes}

## Task
Summarise the overall trend of these trials from three angles:
1. Characteristics of the patients
2. Characteristics of the interventions
3. Trends in the main outcome measures

Requirements:
- Language: Japanese
- Length: 3-4 sentences
- Focus: how patients, interventions and outcomes relate"#;

pub(super) const STUDY: &str = r#"Summarise the following clinical trial for a clinical researcher.

### Study {nct_id}
- Title: {title}
- Status: {status}
- Start date: {start_date}
- Completion date: {end_date}
- Sponsor: {sponsor}
- Interventions: {interventions}
- Primary outcomes: {primary_outcomes}
- Secondary outcomes: {secondary_outcomes}

Brief summary:
{brief_summary}

Cover the objective, design, population, interventions and key outcome measures.
Answer in Japanese, in at most 5 sentences."#;

pub(super) const CROSS_STUDY: &str = r#"Analyse the following clinical trial summaries across studies and cover:
1. Common interventions
2. Trends in primary outcome measures
3. Characteristics of the study designs
4. Characteristics of the target patients

{summaries}

Answer as bullet points, in Japanese."#;

pub(super) const ELIGIBILITY: &str = r#"Analyse the following eligibility criteria and summarise:
1. The most common inclusion criteria
2. The most common exclusion criteria
3. Distinctive or unusual criteria
4. Trends regarding age and sex

Eligibility criteria:
{criteria}

Answer as bullet points, in Japanese."#;

pub(super) const PUBLICATIONS: &str = r#"Summarise the following publications linked to clinical trials and analyse:
1. Main research themes
2. Important results or findings
3. Clinical significance

{summaries}

Answer as bullet points, in Japanese."#;

pub(super) const COMPARISON: &str = r#"Compare the following clinical trials and summarise:
1. Similarities and differences in study design
2. Comparison of interventions
3. Differences in outcome measures
4. Differences in patient selection criteria
5. Strengths and weaknesses of each trial

{comparison_data}

Answer as bullet points, in Japanese."#;

pub(super) const PROTOCOL: &str = r#"Draft a protocol for a new clinical trial from the information below.

Target condition: {target_condition}
Intervention: {intervention}
Primary outcome: {primary_outcome}
Phase: {phase}
Study design: {study_design}
Planned duration: {duration_weeks} weeks
Target sample size: {population_size}
Control group: {control_group}
Key inclusion criteria: {inclusion_criteria}
Key exclusion criteria: {exclusion_criteria}
Level of detail: {detail_level}
Sections to elaborate: {focus_areas}

Existing clinical trials for reference:
{existing_studies}

The draft must contain:
1. Background and objectives
2. Study design
3. Patient selection (inclusion and exclusion criteria)
4. Intervention details
5. Outcome measures (primary and secondary)
6. Statistical considerations

Answer in Japanese and keep every section concise."#;

pub(super) const COMPREHENSIVE: &str = r#"# Comprehensive clinical trial analysis
Studies analysed: {num_studies}

## Data
### Population
{patient}

### Main interventions (top 5)
{interventions}

### Primary outcomes (top 5)
{primary_outcomes}

### Secondary outcomes (top 5)
{secondary_outcomes}

### Eligibility criteria
[Statistics]
{criteria_analysis}

## Task
Integrate the information above into a comprehensive summary covering:
1. Overall characteristics of the study designs
2. How target patients relate to eligibility criteria
   - in particular the distribution of age and sex
   - distinctive inclusion/exclusion criteria seen in the examples
3. Consistency between interventions and outcome measures
4. Notable trends or features

Requirements:
- Write in Japanese
- Start with a structured section, then close with a narrative analysis
- Be clear without being long
- Pay attention to how the elements relate
- Extract concrete features from the eligibility examples"#;
