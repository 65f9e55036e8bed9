use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub status: PostStatus,
    pub author: Author,
    pub tags: Vec<String>,
    /// Extra attributes keyed by name
    pub meta: HashMap<String, serde_json::Value>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    #[serde(skip)]
    pub revision: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum PostStatus {
    #[serde(rename = "draft")]
    Draft,
    #[serde(rename = "published")]
    Published,
}

pub mod taxonomy {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Category {
        pub name: String,
        pub parent: Option<Box<Category>>,
        pub children: Vec<Category>,
    }
}
