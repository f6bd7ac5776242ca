use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CategoryCreate {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryUpdate {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExerciseCreate {
    pub name: String,
    pub description: String,
    pub category_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct ExerciseUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i32>,
}
