use serde::{Deserialize, Serialize};

// -------------------- CodeSystem --------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CodeSystem {
    pub id: Option<String>,
    pub url: Option<String>,
    pub version: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    /// `complete`, `fragment`, `example`, `not-present` or `supplement`.
    pub content: Option<String>,
    #[serde(rename = "valueSet")]
    pub value_set: Option<String>,
    pub concept: Option<Vec<Concept>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Concept {
    pub code: String,
    pub display: Option<String>,
    pub definition: Option<String>,
    pub concept: Option<Vec<Concept>>,
}

impl CodeSystem {
    /// Only complete CodeSystems enumerate every code they define.
    pub fn is_complete(&self) -> bool {
        self.content.as_deref() == Some("complete")
    }

    pub fn concepts(&self) -> &[Concept] {
        self.concept.as_deref().unwrap_or(&[])
    }
}

impl Concept {
    pub fn children(&self) -> &[Concept] {
        self.concept.as_deref().unwrap_or(&[])
    }
}

// -------------------- ValueSet --------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValueSet {
    pub id: Option<String>,
    pub url: Option<String>,
    pub version: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub compose: Option<ValueSetCompose>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValueSetCompose {
    pub include: Option<Vec<ValueSetInclude>>,
    pub exclude: Option<Vec<ValueSetInclude>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValueSetInclude {
    pub system: Option<String>,
    #[serde(rename = "valueSet")]
    pub value_set: Option<Vec<String>>,
    pub concept: Option<Vec<ValueSetConcept>>,
    pub filter: Option<Vec<ValueSetFilter>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueSetConcept {
    pub code: String,
    pub display: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueSetFilter {
    pub property: Option<String>,
    pub op: Option<String>,
    pub value: Option<String>,
}
