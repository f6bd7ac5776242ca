use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::catalog::dto::{CategoryCreate, CategoryUpdate, ExerciseCreate, ExerciseUpdate};
use crate::errors::AppError;
use crate::repo::{Columns, CrudRepo, Entity, SqlValue};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: i32,
    pub name: String,
}

impl Entity for Category {
    const TABLE: &'static str = "categories";
    const COLUMNS: &'static str = "id, name";
    const NAME: &'static str = "Category";

    fn id(&self) -> i32 {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Exercise {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub category_id: i32,
}

impl Entity for Exercise {
    const TABLE: &'static str = "exercises";
    const COLUMNS: &'static str = "id, name, description, category_id";
    const NAME: &'static str = "Exercise";

    fn id(&self) -> i32 {
        self.id
    }
}

/// Exercise joined with its category name. Read convenience only.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ExerciseDetails {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub category_id: i32,
    pub category_name: String,
}

impl Columns for CategoryCreate {
    fn columns(&self) -> Vec<(&'static str, SqlValue)> {
        vec![("name", self.name.clone().into())]
    }
}

impl Columns for CategoryUpdate {
    fn columns(&self) -> Vec<(&'static str, SqlValue)> {
        let mut cols: Vec<(&'static str, SqlValue)> = Vec::new();
        if let Some(v) = &self.name {
            cols.push(("name", v.clone().into()));
        }
        cols
    }
}

impl Columns for ExerciseCreate {
    fn columns(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("name", self.name.clone().into()),
            ("description", self.description.clone().into()),
            ("category_id", self.category_id.into()),
        ]
    }
}

impl Columns for ExerciseUpdate {
    fn columns(&self) -> Vec<(&'static str, SqlValue)> {
        let mut cols: Vec<(&'static str, SqlValue)> = Vec::new();
        if let Some(v) = &self.name {
            cols.push(("name", v.clone().into()));
        }
        if let Some(v) = &self.description {
            cols.push(("description", v.clone().into()));
        }
        if let Some(v) = self.category_id {
            cols.push(("category_id", v.into()));
        }
        cols
    }
}

pub const CATEGORIES: CrudRepo<Category> = CrudRepo::new();
pub const EXERCISES: CrudRepo<Exercise> = CrudRepo::new();

/// Detail lookup resolving the category name in one round trip.
pub async fn get_exercise_with_category(
    db: &PgPool,
    id: i32,
) -> Result<Option<ExerciseDetails>, AppError> {
    let row = sqlx::query_as::<_, ExerciseDetails>(
        r#"
        SELECT e.id, e.name, e.description, e.category_id, c.name AS category_name
        FROM exercises e
        JOIN categories c ON c.id = e.category_id
        WHERE e.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_update_is_partial() {
        assert!(CategoryUpdate { name: None }.columns().is_empty());
        let cols = CategoryUpdate {
            name: Some("legs".into()),
        }
        .columns();
        assert_eq!(cols, vec![("name", SqlValue::Text("legs".into()))]);
    }

    #[test]
    fn exercise_create_emits_every_column() {
        let cols = ExerciseCreate {
            name: "squats".into(),
            description: "back squats".into(),
            category_id: 3,
        }
        .columns();
        let names: Vec<_> = cols.iter().map(|(c, _)| *c).collect();
        assert_eq!(names, ["name", "description", "category_id"]);
    }

    #[test]
    fn exercise_update_emits_only_present_fields() {
        let cols = ExerciseUpdate {
            name: None,
            description: Some("front squats".into()),
            category_id: None,
        }
        .columns();
        assert_eq!(
            cols,
            vec![("description", SqlValue::Text("front squats".into()))]
        );
    }
}
