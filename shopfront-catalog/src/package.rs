use shopfront_core::PackageRepository;
use shopfront_shared::{Package, PackageDraft};
use std::sync::Arc;

use crate::CatalogError;

/// Operator CRUD over subscription packages
pub struct PackageService {
    repo: Arc<dyn PackageRepository>,
}

impl PackageService {
    pub fn new(repo: Arc<dyn PackageRepository>) -> Self {
        Self { repo }
    }

    /// Newest first
    pub async fn list_packages(&self, active_only: bool) -> Result<Vec<Package>, CatalogError> {
        self.repo
            .list_packages(active_only)
            .await
            .map_err(|e| CatalogError::Persistence(e.to_string()))
    }

    pub async fn get_package(&self, id: i64) -> Result<Package, CatalogError> {
        self.repo
            .get_package(id)
            .await
            .map_err(|e| CatalogError::Persistence(e.to_string()))?
            .ok_or(CatalogError::NotFound("Package", id))
    }

    pub async fn create_package(&self, draft: &PackageDraft) -> Result<Package, CatalogError> {
        if let Some(problem) = draft.problem() {
            return Err(CatalogError::Invalid(problem.to_string()));
        }

        let package = self
            .repo
            .create_package(draft)
            .await
            .map_err(|e| CatalogError::Persistence(e.to_string()))?;

        tracing::info!("Created package {} ({})", package.id, package.name);
        Ok(package)
    }

    pub async fn update_package(&self, id: i64, draft: &PackageDraft) -> Result<Package, CatalogError> {
        if let Some(problem) = draft.problem() {
            return Err(CatalogError::Invalid(problem.to_string()));
        }

        self.repo
            .update_package(id, draft)
            .await
            .map_err(|e| CatalogError::Persistence(e.to_string()))?
            .ok_or(CatalogError::NotFound("Package", id))
    }

    /// Orders that reference the package keep their snapshot of it
    pub async fn delete_package(&self, id: i64) -> Result<(), CatalogError> {
        let deleted = self
            .repo
            .delete_package(id)
            .await
            .map_err(|e| CatalogError::Persistence(e.to_string()))?;

        if !deleted {
            return Err(CatalogError::NotFound("Package", id));
        }

        tracing::info!("Deleted package {}", id);
        Ok(())
    }
}
