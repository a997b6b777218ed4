use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::models::scorecard::{
    Category, CategoryRow, Criterion, CriterionRow, Scorecard, ScorecardRow, Weight,
};
use crate::scorecards::{RepositoryError, ScorecardRepository};

/// Loads scorecards from `scorecards`, `scorecard_categories` and
/// `scorecard_criteria`. Categories and criteria are ordered by `position`.
#[derive(Clone)]
pub struct PgScorecardRepository {
    pool: PgPool,
}

impl PgScorecardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScorecardRepository for PgScorecardRepository {
    async fn get_scorecard(&self, id: Uuid) -> Result<Option<Scorecard>, RepositoryError> {
        let row: Option<ScorecardRow> = sqlx::query_as(
            "SELECT id, name, updated_at FROM scorecards WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let categories: Vec<CategoryRow> = sqlx::query_as(
            r#"
            SELECT id, name
            FROM scorecard_categories
            WHERE scorecard_id = $1
            ORDER BY position, id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let criteria: Vec<CriterionRow> = sqlx::query_as(
            r#"
            SELECT c.id, c.category_id, c.name, c.description, c.weight, c.embedding
            FROM scorecard_criteria c
            JOIN scorecard_categories cat ON cat.id = c.category_id
            WHERE cat.scorecard_id = $1
            ORDER BY c.position, c.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        debug!(
            "Loaded scorecard {} (updated {}): {} categories, {} criteria",
            row.id,
            row.updated_at,
            categories.len(),
            criteria.len()
        );

        assemble_scorecard(row, categories, criteria).map(Some)
    }
}

/// Builds the domain scorecard from flat rows. Rows must already be ordered.
fn assemble_scorecard(
    row: ScorecardRow,
    categories: Vec<CategoryRow>,
    criteria: Vec<CriterionRow>,
) -> Result<Scorecard, RepositoryError> {
    let mut assembled: Vec<Category> = categories
        .into_iter()
        .map(|c| Category {
            id: c.id,
            name: c.name,
            criteria: Vec::new(),
        })
        .collect();

    for criterion in criteria {
        let weight = u8::try_from(criterion.weight)
            .map_err(|_| format!("weight {} out of range", criterion.weight))
            .and_then(Weight::try_from)
            .map_err(|e| {
                RepositoryError::InvalidData(format!("criterion {}: {e}", criterion.id))
            })?;

        let category = assembled
            .iter_mut()
            .find(|c| c.id == criterion.category_id)
            .ok_or_else(|| {
                RepositoryError::InvalidData(format!(
                    "criterion {} references unknown category {}",
                    criterion.id, criterion.category_id
                ))
            })?;

        category.criteria.push(Criterion {
            id: criterion.id,
            name: criterion.name,
            description: criterion.description,
            weight,
            embedding: criterion.embedding.unwrap_or_default(),
        });
    }

    Ok(Scorecard {
        id: row.id,
        name: row.name,
        categories: assembled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn scorecard_row() -> ScorecardRow {
        ScorecardRow {
            id: Uuid::new_v4(),
            name: "Backend Engineer".to_string(),
            updated_at: Utc::now(),
        }
    }

    fn category_row(name: &str) -> CategoryRow {
        CategoryRow {
            id: Uuid::new_v4(),
            name: name.to_string(),
        }
    }

    fn criterion_row(category_id: Uuid, name: &str, weight: i16) -> CriterionRow {
        CriterionRow {
            id: Uuid::new_v4(),
            category_id,
            name: name.to_string(),
            description: format!("{name} description"),
            weight,
            embedding: None,
        }
    }

    #[test]
    fn test_assemble_groups_criteria_under_categories_in_order() {
        let row = scorecard_row();
        let tech = category_row("Technical Skills");
        let comms = category_row("Communication");
        let criteria = vec![
            criterion_row(tech.id, "Python experience", 3),
            criterion_row(comms.id, "Public speaking", 1),
            criterion_row(tech.id, "SQL", 2),
        ];

        let scorecard =
            assemble_scorecard(row, vec![tech, comms], criteria).unwrap();

        assert_eq!(scorecard.categories.len(), 2);
        assert_eq!(scorecard.categories[0].name, "Technical Skills");
        let tech_names: Vec<&str> = scorecard.categories[0]
            .criteria
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(tech_names, vec!["Python experience", "SQL"]);
        assert_eq!(scorecard.categories[1].criteria[0].weight, Weight::Low);
        assert_eq!(scorecard.criteria_count(), 3);
    }

    #[test]
    fn test_assemble_rejects_invalid_weight() {
        let row = scorecard_row();
        let cat = category_row("Technical Skills");
        let criteria = vec![criterion_row(cat.id, "Rust", 7)];

        let err = assemble_scorecard(row, vec![cat], criteria).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidData(_)));
    }

    #[test]
    fn test_assemble_rejects_negative_weight() {
        let row = scorecard_row();
        let cat = category_row("Technical Skills");
        let criteria = vec![criterion_row(cat.id, "Rust", -1)];

        assert!(assemble_scorecard(row, vec![cat], criteria).is_err());
    }

    #[test]
    fn test_assemble_rejects_orphan_criterion() {
        let row = scorecard_row();
        let criteria = vec![criterion_row(Uuid::new_v4(), "Rust", 2)];

        let err = assemble_scorecard(row, vec![], criteria).unwrap_err();
        assert!(err.to_string().contains("unknown category"));
    }

    #[test]
    fn test_assemble_keeps_stored_embedding() {
        let row = scorecard_row();
        let cat = category_row("Technical Skills");
        let mut criterion = criterion_row(cat.id, "Rust", 2);
        criterion.embedding = Some(vec![0.5, 0.5]);

        let scorecard = assemble_scorecard(row, vec![cat], vec![criterion]).unwrap();
        assert_eq!(scorecard.categories[0].criteria[0].embedding, vec![0.5, 0.5]);
    }
}
