use serde::{Deserialize, Serialize};

/// A scraped candidate profile. Every field is optional: providers return
/// whatever they managed to extract, and absence is checked explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateProfile {
    pub full_name: Option<String>,
    pub headline: Option<String>,
    #[serde(alias = "about")]
    pub summary: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub experiences: Vec<Experience>,
    pub education: Vec<Education>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    pub school: Option<String>,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
    pub start_year: Option<String>,
    pub end_year: Option<String>,
}

/// Returns the trimmed value if present and non-blank.
pub fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
