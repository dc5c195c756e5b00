//! Topic schemas.
//!
//! Each research topic declares its output fields (name, kind, description),
//! its retry budget, and the prompt material used to task the research
//! agent. The pipeline is generic over a `Schema`; adding a topic means
//! adding a schema entry here, nothing else.

use crate::record::UNKNOWN;

/// One research subject with its own schema and prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    BasicInfo,
    LaunchCost,
    TechnicalSpecs,
    UserInfo,
    PurposeSdg,
    Frugal,
    Numeric,
}

impl Topic {
    /// Storage key for this topic.
    pub fn key(&self) -> &'static str {
        match self {
            Topic::BasicInfo => "basic_info",
            Topic::LaunchCost => "launch_cost_info",
            Topic::TechnicalSpecs => "technical_specs",
            Topic::UserInfo => "user_info",
            Topic::PurposeSdg => "purpose_sdg",
            Topic::Frugal => "frugal",
            Topic::Numeric => "numeric",
        }
    }

    /// Human-readable title for logs and summaries.
    pub fn title(&self) -> &'static str {
        match self {
            Topic::BasicInfo => "Basic Orbital Info",
            Topic::LaunchCost => "Launch & Cost",
            Topic::TechnicalSpecs => "Technical Specs",
            Topic::UserInfo => "User Category",
            Topic::PurposeSdg => "Purpose & SDG",
            Topic::Frugal => "Frugality",
            Topic::Numeric => "Return on Investment",
        }
    }

    pub fn all() -> [Topic; 7] {
        [
            Topic::BasicInfo,
            Topic::LaunchCost,
            Topic::TechnicalSpecs,
            Topic::UserInfo,
            Topic::PurposeSdg,
            Topic::Frugal,
            Topic::Numeric,
        ]
    }

    pub fn from_key(key: &str) -> Option<Topic> {
        Topic::all().into_iter().find(|t| t.key() == key)
    }
}

/// Semantic kind of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text.
    Text,
    /// Numeric value (integer or float).
    Number,
    /// Small-integer enum (category codes, 0/1 flags).
    EnumInt,
    /// List of integers.
    IntList,
    /// Nested JSON object.
    Object,
    /// Source URL or citation.
    SourceUrl,
}

impl FieldKind {
    /// Type word used in the format-instructions template.
    fn type_word(&self) -> &'static str {
        match self {
            FieldKind::Text | FieldKind::SourceUrl => "string",
            FieldKind::Number => "number",
            FieldKind::EnumInt => "int",
            FieldKind::IntList => "int[]",
            FieldKind::Object => "object",
        }
    }
}

/// One output field of a topic schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
}

const fn field(name: &'static str, kind: FieldKind, description: &'static str) -> FieldDef {
    FieldDef {
        name,
        kind,
        description,
    }
}

/// Ordered field definitions for a topic, with retry budget and prompt text.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub topic: Topic,
    pub fields: &'static [FieldDef],
    /// Retry attempts for this topic's whole pipeline cycle.
    pub max_attempts: u32,
    /// What the agent is asked to research, phrased for the task prompt.
    pub focus: &'static str,
    /// Topic-specific research guidance embedded in the task prompt.
    pub guidance: &'static str,
    /// Terms appended to the satellite name when building a search query.
    pub query_terms: &'static str,
}

impl Schema {
    /// Look up the canonical schema for a topic.
    pub fn for_topic(topic: Topic) -> &'static Schema {
        match topic {
            Topic::BasicInfo => &BASIC_INFO,
            Topic::LaunchCost => &LAUNCH_COST,
            Topic::TechnicalSpecs => &TECHNICAL_SPECS,
            Topic::UserInfo => &USER_INFO,
            Topic::PurposeSdg => &PURPOSE_SDG,
            Topic::Frugal => &FRUGAL,
            Topic::Numeric => &NUMERIC,
        }
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Source/citation fields in declared order.
    pub fn source_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .filter(|f| f.kind == FieldKind::SourceUrl)
            .map(|f| f.name)
    }

    /// Format instructions for the agent: a fenced JSON template with one
    /// commented line per field.
    pub fn format_instructions(&self) -> String {
        let mut out = String::from(
            "The output should be a markdown code snippet formatted in the \
             following schema, including the leading and trailing \"```json\" \
             and \"```\":\n\n```json\n{\n",
        );
        for field in self.fields {
            out.push_str(&format!(
                "\t\"{}\": {}  // {}\n",
                field.name,
                field.kind.type_word(),
                field.description
            ));
        }
        out.push_str("}\n```");
        out
    }

    /// Search query for this topic and satellite.
    pub fn search_query(&self, satellite_name: &str) -> String {
        format!("\"{}\" {}", satellite_name, self.query_terms)
    }

    /// Full task prompt for one research run.
    pub fn task_prompt(&self, satellite_name: &str, max_actions: usize) -> String {
        format!(
            "Find {} for the satellite: {}\n\
             {}\n\n\
             Steps to follow:\n\
             1. Search for {} using the web search tool\n\
             2. Analyze the search results for the required information\n\
             3. If needed, perform additional searches for specific details\n\
             4. When you have gathered sufficient information, provide the \
             final structured output in this exact JSON format:\n\n\
             {}\n\n\
             IMPORTANT:\n\
             - You have a maximum of {} actions. Use them efficiently.\n\
             - If you cannot find specific information, use \"{}\" for that field\n\
             - If you're running out of actions, prioritize the most critical \
             information and provide the structured output\n\
             - Always include source URLs when data is available, otherwise use \"{}\"\n\n\
             Remember: Use \"{}\" for any information that cannot be found or verified.",
            self.focus,
            satellite_name,
            self.guidance,
            self.search_query(satellite_name),
            self.format_instructions(),
            max_actions,
            UNKNOWN,
            UNKNOWN,
            UNKNOWN,
        )
    }
}

use FieldKind::{EnumInt, IntList, Number, Object, SourceUrl, Text};

static BASIC_INFO: Schema = Schema {
    topic: Topic::BasicInfo,
    fields: &[
        field("altitude", Text, "Orbital altitude in kilometers"),
        field("altitude_source", SourceUrl, "Source URL for altitude information"),
        field("orbital_life_years", Number, "Orbital lifetime in years"),
        field(
            "orbital_life_source",
            SourceUrl,
            "Source URL for orbital lifetime information",
        ),
        field(
            "launch_orbit_classification",
            Text,
            "Orbit classification (LEO, MEO, GEO, etc.)",
        ),
        field(
            "orbit_classification_source",
            SourceUrl,
            "Source URL for orbit classification information",
        ),
        field("number_of_payloads", Number, "Number of payloads on the satellite"),
        field("payloads_source", SourceUrl, "Source URL for payload information"),
    ],
    max_attempts: 5,
    focus: "comprehensive orbital information",
    guidance: "First try to find the data on https://nextspaceflight.com/; if it \
               is not available there, look at other websites, articles, news, \
               press releases, and parliament reports.\n\n\
               Required information to find:\n\
               1. Orbital altitude in kilometers (perigee/apogee or average)\n\
               2. Orbital lifetime in years (operational or design life)\n\
               3. Orbit classification (LEO, MEO, GEO, etc.)\n\
               4. Number of payloads",
    query_terms: "satellite orbital altitude orbit classification payload launch specifications",
};

static LAUNCH_COST: Schema = Schema {
    topic: Topic::LaunchCost,
    fields: &[
        field("launch_cost", Text, "Launch cost in USD"),
        field("launch_cost_source", SourceUrl, "Source URL for launch cost data"),
        field("launch_vehicle", Text, "Launch vehicle used"),
        field(
            "launch_vehicle_source",
            SourceUrl,
            "Source URL for launch vehicle information",
        ),
        field("launch_date", Text, "Launch date"),
        field(
            "launch_date_source",
            SourceUrl,
            "Source URL for launch date information",
        ),
        field("launch_site", Text, "Launch site"),
        field(
            "launch_site_source",
            SourceUrl,
            "Source URL for launch site information",
        ),
        field(
            "launch_mass",
            Object,
            "JSON object containing max_leo and actual_mass",
        ),
        field(
            "launch_mass_source",
            SourceUrl,
            "Source URL for launch mass information",
        ),
        field(
            "launch_success",
            EnumInt,
            "Launch success status (1 for success, 0 for failure)",
        ),
        field(
            "launch_success_source",
            SourceUrl,
            "Source URL for launch success information",
        ),
        field(
            "vehicle_reusability",
            EnumInt,
            "Vehicle reusability status (1 for reusable, 0 for not)",
        ),
        field("reusability_details", Text, "Details about vehicle reusability"),
        field(
            "reusability_source",
            SourceUrl,
            "Source URL for reusability information",
        ),
        field("mission_cost", Object, "JSON object containing all cost components"),
        field(
            "mission_cost_source",
            SourceUrl,
            "Source URL for mission cost information",
        ),
    ],
    max_attempts: 3,
    focus: "comprehensive cost and launch information",
    guidance: "First try to find the data on https://nextspaceflight.com/; if it \
               is not available there, look at other websites, articles, news, \
               press releases, and parliament reports.\n\n\
               Required information to find:\n\
               1. Launch cost in USD\n\
               2. Launch vehicle details\n\
               3. Launch date and site\n\
               4. Launch mass information\n\
               5. Launch success status\n\
               6. Vehicle reusability details\n\
               7. Mission cost components",
    query_terms: "satellite launch cost vehicle date site mass success reusability mission cost",
};

static TECHNICAL_SPECS: Schema = Schema {
    topic: Topic::TechnicalSpecs,
    fields: &[
        field(
            "satellite_type",
            Text,
            "The type of satellite (Communication / Earth Observation / Experimental / \
             Navigation / Science & Exploration)",
        ),
        field(
            "satellite_type_source",
            SourceUrl,
            "URL of the source for satellite type information",
        ),
        field(
            "satellite_application",
            Text,
            "Detailed description of the satellite's application",
        ),
        field(
            "application_source",
            SourceUrl,
            "URL of the source for satellite application information",
        ),
        field(
            "sensor_specs",
            Object,
            "Object containing sensor specifications (spectral bands and spatial resolution)",
        ),
        field(
            "sensor_specs_source",
            SourceUrl,
            "URL of the source for sensor specifications",
        ),
        field(
            "technological_breakthroughs",
            Text,
            "Notable technological breakthroughs of the satellite",
        ),
        field(
            "breakthrough_source",
            SourceUrl,
            "URL of the source for technological breakthroughs",
        ),
    ],
    max_attempts: 3,
    focus: "detailed technical specifications",
    guidance: "Look for official mission pages, manufacturer datasheets, and \
               reputable space databases.\n\n\
               Required information to find:\n\
               1. Satellite type\n\
               2. Application description\n\
               3. Sensor specifications (spectral bands, spatial resolution)\n\
               4. Technological breakthroughs",
    query_terms: "satellite type application sensor specifications technological breakthroughs",
};

static USER_INFO: Schema = Schema {
    topic: Topic::UserInfo,
    fields: &[
        field(
            "user_category_number",
            EnumInt,
            "Integer representing user category (1: Military, 2: Civil, 3: Commercial, \
             4: Government, 5: Mix)",
        ),
        field(
            "user_description",
            Text,
            "String describing the satellite user or operator",
        ),
        field(
            "user_source_link",
            SourceUrl,
            "String containing the source URL or citation for user information",
        ),
    ],
    max_attempts: 3,
    focus: "who operates, owns, or uses it",
    guidance: "Look for official sources, government/agency/organization websites, \
               news, or reputable databases.\n\n\
               Required information to find:\n\
               1. User category (1: Military, 2: Civil, 3: Commercial, 4: Government, 5: Mix)\n\
               2. Description of the user/operator/owner\n\
               3. Source URL or citation for the user information",
    query_terms: "satellite operator owner user",
};

static PURPOSE_SDG: Schema = Schema {
    topic: Topic::PurposeSdg,
    fields: &[
        field(
            "purpose",
            EnumInt,
            "Integer representing purpose (1: Communications, 2: Earth Observation, \
             3: Navigation, 4: Space Science, 5: Technology Development)",
        ),
        field(
            "purpose_category_number",
            EnumInt,
            "Integer representing purpose category number (same as purpose)",
        ),
        field(
            "purpose_description",
            Text,
            "String describing the satellite's purpose",
        ),
        field(
            "purpose_source_link",
            SourceUrl,
            "String containing the source URL or citation for purpose",
        ),
        field(
            "sdg_category",
            EnumInt,
            "Integer representing SDG category (1: Economic, 2: Social, 3: Environmental, \
             4: Innovation)",
        ),
        field(
            "sdg_category_identification_numbers",
            IntList,
            "Array of integers representing SDG numbers (e.g., [13, 15])",
        ),
        field("sdg_description", Text, "String describing SDGs served"),
        field(
            "sdg_source_link",
            SourceUrl,
            "String containing the source URL or citation for SDG classification",
        ),
    ],
    max_attempts: 3,
    focus: "its purpose and the UN Sustainable Development Goals it serves",
    guidance: "Required information to find:\n\
               1. Purpose (1: Communications, 2: Earth Observation, 3: Navigation, \
               4: Space Science, 5: Technology Development)\n\
               2. Purpose category number (same as purpose)\n\
               3. Description of the satellite's purpose\n\
               4. Source URL or citation for the purpose\n\
               5. SDG category (1: Economic, 2: Social, 3: Environmental, 4: Innovation)\n\
               6. SDG numbers (e.g., [13, 15])\n\
               7. SDG description\n\
               8. Source URL or citation for SDG mapping",
    query_terms: "satellite purpose SDG sustainable development goals",
};

static FRUGAL: Schema = Schema {
    topic: Topic::Frugal,
    fields: &[
        field(
            "frugal",
            Text,
            "String enum (YES/NO) indicating if the satellite is frugal",
        ),
        field(
            "development_cost_efficiency",
            EnumInt,
            "Integer (0: No, 1: Yes) indicating development cost efficiency",
        ),
        field(
            "development_cost_efficiency_description",
            Text,
            "String explaining development cost efficiency",
        ),
        field(
            "development_cost_efficiency_source",
            SourceUrl,
            "String containing source for development cost efficiency",
        ),
        field(
            "operational_cost_efficiency",
            EnumInt,
            "Integer (0: No, 1: Yes) indicating operational cost efficiency",
        ),
        field(
            "operational_cost_efficiency_description",
            Text,
            "String explaining operational cost efficiency",
        ),
        field(
            "operational_cost_efficiency_source",
            SourceUrl,
            "String containing source for operational cost efficiency",
        ),
        field(
            "labour_cost_efficiency",
            EnumInt,
            "Integer (0: No, 1: Yes) indicating labour cost efficiency",
        ),
        field(
            "labour_cost_efficiency_description",
            Text,
            "String explaining labour cost efficiency",
        ),
        field(
            "labour_cost_efficiency_source",
            SourceUrl,
            "String containing source for labour cost efficiency",
        ),
        field(
            "frugal_innovation_design",
            EnumInt,
            "Integer (0: No, 1: Yes) indicating frugal innovation design",
        ),
        field(
            "frugal_innovation_design_description",
            Text,
            "String explaining frugal innovation design",
        ),
        field(
            "frugal_innovation_design_source",
            SourceUrl,
            "String containing source for frugal innovation design",
        ),
    ],
    max_attempts: 3,
    focus: "whether it is a frugal satellite",
    guidance: "Assess cost efficiency against comparable missions.\n\n\
               Required information to find:\n\
               1. Overall frugality (YES/NO)\n\
               2. Development cost efficiency (0/1) with explanation and source\n\
               3. Operational cost efficiency (0/1) with explanation and source\n\
               4. Labour cost efficiency (0/1) with explanation and source\n\
               5. Frugal innovation design (0/1) with explanation and source",
    query_terms: "satellite frugal development operational labour cost efficiency innovation",
};

static NUMERIC: Schema = Schema {
    topic: Topic::Numeric,
    fields: &[
        field(
            "return_on_investment",
            Number,
            "Number representing return on investment value",
        ),
        field(
            "data_of_revenue_from_satellite_launch_musd",
            Number,
            "Number representing revenue from satellite launch in million USD",
        ),
        field(
            "return_on_investment_description",
            Text,
            "String describing or explaining ROI",
        ),
        field(
            "return_on_investment_source",
            SourceUrl,
            "String containing source for ROI and revenue",
        ),
    ],
    max_attempts: 3,
    focus: "its return on investment and launch revenue",
    guidance: "Required information to find:\n\
               1. Return on investment value\n\
               2. Revenue from satellite launch in million USD\n\
               3. Description or explanation of the ROI\n\
               4. Source URL or citation for ROI and revenue",
    query_terms: "satellite return on investment revenue launch million USD",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_all_topics() {
        for topic in Topic::all() {
            let schema = Schema::for_topic(topic);
            assert_eq!(schema.topic, topic);
            assert!(!schema.fields.is_empty());
            assert!(schema.max_attempts >= 3);
        }
    }

    #[test]
    fn test_field_counts() {
        assert_eq!(Schema::for_topic(Topic::BasicInfo).fields.len(), 8);
        assert_eq!(Schema::for_topic(Topic::LaunchCost).fields.len(), 17);
        assert_eq!(Schema::for_topic(Topic::TechnicalSpecs).fields.len(), 8);
        assert_eq!(Schema::for_topic(Topic::UserInfo).fields.len(), 3);
        assert_eq!(Schema::for_topic(Topic::PurposeSdg).fields.len(), 8);
        assert_eq!(Schema::for_topic(Topic::Frugal).fields.len(), 13);
        assert_eq!(Schema::for_topic(Topic::Numeric).fields.len(), 4);
    }

    #[test]
    fn test_topic_key_roundtrip() {
        for topic in Topic::all() {
            assert_eq!(Topic::from_key(topic.key()), Some(topic));
        }
        assert_eq!(Topic::from_key("bogus"), None);
    }

    #[test]
    fn test_basic_info_retries_more() {
        assert_eq!(Schema::for_topic(Topic::BasicInfo).max_attempts, 5);
        assert_eq!(Schema::for_topic(Topic::LaunchCost).max_attempts, 3);
    }

    #[test]
    fn test_format_instructions_are_fenced() {
        let schema = Schema::for_topic(Topic::UserInfo);
        let instructions = schema.format_instructions();
        assert!(instructions.contains("```json"));
        assert!(instructions.ends_with("```"));
        assert!(instructions.contains("\"user_category_number\": int"));
        assert!(instructions.contains("\"user_source_link\": string"));
    }

    #[test]
    fn test_source_fields_in_declared_order() {
        let schema = Schema::for_topic(Topic::LaunchCost);
        let sources: Vec<&str> = schema.source_fields().collect();
        assert_eq!(sources[0], "launch_cost_source");
        assert_eq!(sources[1], "launch_vehicle_source");
        assert_eq!(sources.last(), Some(&"mission_cost_source"));
        assert_eq!(sources.len(), 8);
    }

    #[test]
    fn test_task_prompt_embeds_name_and_budget() {
        let schema = Schema::for_topic(Topic::BasicInfo);
        let prompt = schema.task_prompt("Cartosat-3", 10);
        assert!(prompt.contains("Cartosat-3"));
        assert!(prompt.contains("maximum of 10 actions"));
        assert!(prompt.contains("```json"));
        assert!(prompt.contains("nextspaceflight.com"));
    }
}
