use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// template rendered for paths no page matches
pub const NOT_FOUND_TEMPLATE: &str = "404.tt";

/// a single routable page of the site
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PageNode {
    /// exact url path this page is served under
    pub path: String,

    /// template used to render this page
    pub template: String,

    /// nested sub-pages
    #[serde(default, rename = "pages", skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PageNode>,

    /// remaining data of this page
    /// passed to the templates when rendering
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl PageNode {
    /// substitute page rendered when no page matches the request path
    pub fn not_found(path: &str) -> Self {
        Self {
            path: path.to_owned(),
            template: NOT_FOUND_TEMPLATE.to_owned(),
            children: Vec::new(),
            attributes: Map::new(),
        }
    }
}
