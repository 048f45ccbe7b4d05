use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};

use crate::database::entities::{projects, projects::Entity as Projects};
use crate::errors::ApiError;

/// Each user may publish at most this many project links.
pub const MAX_PROJECTS_PER_OWNER: u64 = 5;

const SUPPORTED_DOMAINS: [&str; 3] = ["github.com", "bucketlist.com", "deepnote.com"];
const SUPPORTED_HOST_FRAGMENTS: [&str; 3] = ["ai", "ml", "ds"];

/// Accepts a project URL if its hostname contains one of the supported
/// domains, or contains "ai", "ml" or "ds" anywhere.
///
/// The fragment rule is deliberately loose and admits unrelated hosts like
/// `mail.com` ("ai") or `mlb.com` ("ml"). Matching is case-sensitive on the
/// raw hostname. Do not tighten without a product decision.
pub fn validate_url(raw: &str) -> bool {
    let Ok(parsed) = url::Url::parse(raw) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };

    SUPPORTED_DOMAINS.iter().any(|domain| host.contains(domain))
        || SUPPORTED_HOST_FRAGMENTS
            .iter()
            .any(|fragment| host.contains(fragment))
}

pub struct ProjectInput {
    pub name: String,
    pub description: String,
    pub url: String,
}

pub struct ProjectService {
    db: DatabaseConnection,
}

impl ProjectService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// All projects, system-wide. The dashboard shows everyone's published
    /// links; only mutations are owner-scoped.
    pub async fn list(&self) -> Result<Vec<projects::Model>, ApiError> {
        Projects::find()
            .all(&self.db)
            .await
            .map_err(|err| ApiError::internal("Failed to fetch projects", err))
    }

    pub async fn get(&self, id: i32) -> Result<projects::Model, ApiError> {
        Projects::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|err| ApiError::internal("Failed to fetch project", err))?
            .ok_or_else(|| ApiError::not_found("Project not found"))
    }

    pub async fn create(
        &self,
        owner_id: &str,
        input: ProjectInput,
    ) -> Result<projects::Model, ApiError> {
        if !validate_url(&input.url) {
            return Err(ApiError::validation("URL host is not supported"));
        }

        // Uniqueness and quota are advisory read-then-write checks; the
        // unique index is the backstop for the rare concurrent duplicate.
        let existing = Projects::find()
            .filter(projects::Column::Name.eq(&input.name))
            .one(&self.db)
            .await
            .map_err(|err| ApiError::internal("Failed to create project", err))?;
        if existing.is_some() {
            return Err(ApiError::conflict(
                "A project with this name already exists",
            ));
        }

        let owned = Projects::find()
            .filter(projects::Column::OwnerId.eq(owner_id))
            .count(&self.db)
            .await
            .map_err(|err| ApiError::internal("Failed to create project", err))?;
        if owned >= MAX_PROJECTS_PER_OWNER {
            return Err(ApiError::conflict("Maximum number of projects reached"));
        }

        let now = Utc::now();
        let project = projects::ActiveModel {
            name: Set(input.name),
            description: Set(input.description),
            url: Set(input.url),
            owner_id: Set(owner_id.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        project
            .insert(&self.db)
            .await
            .map_err(|err| ApiError::internal("Failed to create project", err))
    }

    /// Ownership is enforced in the update filter itself, never as a
    /// post-fetch check, so a non-owner can't learn whether the id exists.
    pub async fn update(
        &self,
        id: i32,
        owner_id: &str,
        input: ProjectInput,
    ) -> Result<projects::Model, ApiError> {
        if !validate_url(&input.url) {
            return Err(ApiError::validation("URL host is not supported"));
        }

        let result = Projects::update_many()
            .col_expr(projects::Column::Name, Expr::value(input.name))
            .col_expr(projects::Column::Description, Expr::value(input.description))
            .col_expr(projects::Column::Url, Expr::value(input.url))
            .col_expr(projects::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(projects::Column::Id.eq(id))
            .filter(projects::Column::OwnerId.eq(owner_id))
            .exec(&self.db)
            .await
            .map_err(|err| ApiError::internal("Failed to update project", err))?;

        if result.rows_affected == 0 {
            return Err(ApiError::not_found(
                "Project not found or you do not have permission to update it",
            ));
        }

        Projects::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|err| ApiError::internal("Failed to update project", err))?
            .ok_or_else(|| {
                ApiError::not_found("Project not found or you do not have permission to update it")
            })
    }

    pub async fn delete(&self, id: i32, owner_id: &str) -> Result<(), ApiError> {
        let result = Projects::delete_many()
            .filter(projects::Column::Id.eq(id))
            .filter(projects::Column::OwnerId.eq(owner_id))
            .exec(&self.db)
            .await
            .map_err(|err| ApiError::internal("Failed to delete project", err))?;

        if result.rows_affected == 0 {
            return Err(ApiError::not_found(
                "Project not found or you do not have permission to delete it",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_supported_domains() {
        assert!(validate_url("https://github.com/x"));
        assert!(validate_url("https://bucketlist.com/trips/42"));
        assert!(validate_url("https://app.deepnote.com/workspace"));
    }

    #[test]
    fn accepts_hostnames_with_ai_ml_ds_fragments() {
        assert!(validate_url("https://foo.ml"));
        assert!(validate_url("https://thing.ds.example"));
        assert!(validate_url("https://openai.example.org"));
        // Over-broad on purpose: "mail" contains "ai".
        assert!(validate_url("https://mail.com/inbox"));
    }

    #[test]
    fn rejects_unparseable_and_unsupported_urls() {
        assert!(!validate_url("not a url"));
        assert!(!validate_url("https://evil.com"));
        assert!(!validate_url(""));
    }

    #[test]
    fn matching_is_case_sensitive_on_the_fragment() {
        // url normalizes hostnames to lowercase, so an uppercase fragment
        // in the input still matches after normalization.
        assert!(validate_url("https://FOO.ML"));
        assert!(!validate_url("https://evil.example"));
    }
}
