//! Ownership-checked operations on saved tax returns.
//!
//! Every call names the [`Requester`]; records are loaded first and then
//! checked with [`authorize`] before anything is returned or changed.

use thiserror::Error;
use tracing::{debug, info};

use crate::access::{AccessDenied, Requester, ReturnAction, authorize};
use crate::calculations::{RateSchedule, compute_with};
use crate::db::repository::{RepositoryError, TaxRepository};
use crate::models::{TaxLiability, TaxReturn, TaxReturnFields};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReturnServiceError {
    #[error("Tax return not found")]
    NotFound,

    #[error(transparent)]
    Forbidden(#[from] AccessDenied),

    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ReturnServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ReturnServiceError::NotFound,
            other => ReturnServiceError::Repository(other),
        }
    }
}

/// A saved return together with its computed liability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub tax_return: TaxReturn,
    pub liability: TaxLiability,
}

pub struct TaxReturnService<'a, R: TaxRepository + ?Sized> {
    repo: &'a R,
    schedule: RateSchedule,
}

impl<'a, R: TaxRepository + ?Sized> TaxReturnService<'a, R> {
    pub fn new(
        repo: &'a R,
        schedule: RateSchedule,
    ) -> Self {
        Self { repo, schedule }
    }

    /// Builds a service whose rate schedule comes from the store, falling
    /// back to the built-in tables when the store has none.
    pub async fn from_repository(repo: &'a R) -> Result<Self, ReturnServiceError> {
        let tables = repo.list_rate_tables().await?;
        debug!(count = tables.len(), "loaded rate tables");
        Ok(Self::new(repo, RateSchedule::from_tables(tables)))
    }

    pub fn schedule(&self) -> &RateSchedule {
        &self.schedule
    }

    /// Saves a new return owned by the requester.
    pub async fn create(
        &self,
        requester: &Requester,
        fields: TaxReturnFields,
    ) -> Result<TaxReturn, ReturnServiceError> {
        let created = self
            .repo
            .create_return(fields.into_new_return(requester.user_id.clone()))
            .await?;
        info!(id = created.id, owner = %created.owner_id, year = created.year, "tax return created");
        Ok(created)
    }

    /// Returns owned by `owner_id`. Only that owner or an admin may list them.
    pub async fn list_for_owner(
        &self,
        requester: &Requester,
        owner_id: &str,
    ) -> Result<Vec<TaxReturn>, ReturnServiceError> {
        authorize(requester, owner_id, ReturnAction::View)?;
        Ok(self.repo.list_returns_for_owner(owner_id).await?)
    }

    pub async fn get(
        &self,
        requester: &Requester,
        id: i64,
    ) -> Result<TaxReturn, ReturnServiceError> {
        self.load_authorized(requester, id, ReturnAction::View).await
    }

    pub async fn update(
        &self,
        requester: &Requester,
        id: i64,
        fields: TaxReturnFields,
    ) -> Result<TaxReturn, ReturnServiceError> {
        let mut tax_return = self
            .load_authorized(requester, id, ReturnAction::Update)
            .await?;

        tax_return.apply(fields);
        self.repo.update_return(&tax_return).await?;
        info!(id, "tax return updated");

        Ok(self.repo.get_return(id).await?)
    }

    pub async fn delete(
        &self,
        requester: &Requester,
        id: i64,
    ) -> Result<(), ReturnServiceError> {
        self.load_authorized(requester, id, ReturnAction::Delete)
            .await?;
        self.repo.delete_return(id).await?;
        info!(id, "tax return deleted");
        Ok(())
    }

    /// Computes the liability of a saved return using the rates for its year.
    pub async fn assess(
        &self,
        requester: &Requester,
        id: i64,
    ) -> Result<Assessment, ReturnServiceError> {
        let tax_return = self.get(requester, id).await?;
        let liability = compute_with(&self.schedule, &tax_return.to_input());

        Ok(Assessment {
            tax_return,
            liability,
        })
    }

    async fn load_authorized(
        &self,
        requester: &Requester,
        id: i64,
        action: ReturnAction,
    ) -> Result<TaxReturn, ReturnServiceError> {
        let tax_return = self.repo.get_return(id).await?;
        authorize(requester, &tax_return.owner_id, action).inspect_err(|_| {
            info!(id, requester = %requester.user_id, %action, "tax return access denied");
        })?;
        Ok(tax_return)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{NewTaxReturn, RateTable};

    // =========================================================================
    // in-memory repository
    // =========================================================================
    #[derive(Default)]
    struct MemoryRepository {
        tables: Mutex<BTreeMap<i32, RateTable>>,
        returns: Mutex<BTreeMap<i64, TaxReturn>>,
    }

    #[async_trait]
    impl TaxRepository for MemoryRepository {
        async fn get_rate_table(
            &self,
            tax_year: i32,
        ) -> Result<RateTable, RepositoryError> {
            self.tables
                .lock()
                .unwrap()
                .get(&tax_year)
                .cloned()
                .ok_or(RepositoryError::NotFound)
        }

        async fn list_rate_tables(&self) -> Result<Vec<RateTable>, RepositoryError> {
            Ok(self.tables.lock().unwrap().values().cloned().collect())
        }

        async fn upsert_rate_table(
            &self,
            table: &RateTable,
        ) -> Result<(), RepositoryError> {
            self.tables
                .lock()
                .unwrap()
                .insert(table.tax_year, table.clone());
            Ok(())
        }

        async fn create_return(
            &self,
            tax_return: NewTaxReturn,
        ) -> Result<TaxReturn, RepositoryError> {
            let mut returns = self.returns.lock().unwrap();
            let id = returns.keys().next_back().copied().unwrap_or(0) + 1;
            let now = Utc::now();
            let created = TaxReturn {
                id,
                owner_id: tax_return.owner_id,
                income: tax_return.income,
                deductions: tax_return.deductions,
                tax_credits: tax_return.tax_credits,
                year: tax_return.year,
                created_at: now,
                updated_at: now,
            };
            returns.insert(id, created.clone());
            Ok(created)
        }

        async fn get_return(
            &self,
            id: i64,
        ) -> Result<TaxReturn, RepositoryError> {
            self.returns
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or(RepositoryError::NotFound)
        }

        async fn update_return(
            &self,
            tax_return: &TaxReturn,
        ) -> Result<(), RepositoryError> {
            let mut returns = self.returns.lock().unwrap();
            let slot = returns
                .get_mut(&tax_return.id)
                .ok_or(RepositoryError::NotFound)?;
            *slot = tax_return.clone();
            Ok(())
        }

        async fn delete_return(
            &self,
            id: i64,
        ) -> Result<(), RepositoryError> {
            self.returns
                .lock()
                .unwrap()
                .remove(&id)
                .map(|_| ())
                .ok_or(RepositoryError::NotFound)
        }

        async fn list_returns_for_owner(
            &self,
            owner_id: &str,
        ) -> Result<Vec<TaxReturn>, RepositoryError> {
            let mut owned: Vec<_> = self
                .returns
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.owner_id == owner_id)
                .cloned()
                .collect();
            owned.sort_by(|a, b| b.year.cmp(&a.year).then(b.id.cmp(&a.id)));
            Ok(owned)
        }
    }

    /// A repository whose every call fails, to check error mapping.
    struct BrokenRepository;

    #[async_trait]
    impl TaxRepository for BrokenRepository {
        async fn get_rate_table(
            &self,
            _tax_year: i32,
        ) -> Result<RateTable, RepositoryError> {
            Err(RepositoryError::Connection("offline".to_string()))
        }
        async fn list_rate_tables(&self) -> Result<Vec<RateTable>, RepositoryError> {
            Err(RepositoryError::Connection("offline".to_string()))
        }
        async fn upsert_rate_table(
            &self,
            _table: &RateTable,
        ) -> Result<(), RepositoryError> {
            Err(RepositoryError::Connection("offline".to_string()))
        }
        async fn create_return(
            &self,
            _tax_return: NewTaxReturn,
        ) -> Result<TaxReturn, RepositoryError> {
            Err(RepositoryError::Connection("offline".to_string()))
        }
        async fn get_return(
            &self,
            _id: i64,
        ) -> Result<TaxReturn, RepositoryError> {
            Err(RepositoryError::Connection("offline".to_string()))
        }
        async fn update_return(
            &self,
            _tax_return: &TaxReturn,
        ) -> Result<(), RepositoryError> {
            Err(RepositoryError::Connection("offline".to_string()))
        }
        async fn delete_return(
            &self,
            _id: i64,
        ) -> Result<(), RepositoryError> {
            Err(RepositoryError::Connection("offline".to_string()))
        }
        async fn list_returns_for_owner(
            &self,
            _owner_id: &str,
        ) -> Result<Vec<TaxReturn>, RepositoryError> {
            Err(RepositoryError::Connection("offline".to_string()))
        }
    }

    fn fields(
        income: Decimal,
        year: i32,
    ) -> TaxReturnFields {
        TaxReturnFields {
            income,
            deductions: dec!(5000),
            tax_credits: dec!(3500),
            year,
        }
    }

    fn service(repo: &MemoryRepository) -> TaxReturnService<'_, MemoryRepository> {
        TaxReturnService::new(repo, RateSchedule::builtin())
    }

    // =========================================================================
    // create / get
    // =========================================================================
    #[tokio::test]
    async fn create_assigns_requester_as_owner() {
        let repo = MemoryRepository::default();
        let svc = service(&repo);

        let created = svc
            .create(&Requester::user("aoife"), fields(dec!(50000), 2023))
            .await
            .expect("create should succeed");

        assert_eq!(created.owner_id, "aoife");
        assert_eq!(created.income, dec!(50000));
        assert_eq!(created.year, 2023);
    }

    #[tokio::test]
    async fn owner_and_admin_can_get_but_stranger_cannot() {
        let repo = MemoryRepository::default();
        let svc = service(&repo);
        let created = svc
            .create(&Requester::user("aoife"), fields(dec!(50000), 2023))
            .await
            .unwrap();

        assert!(svc.get(&Requester::user("aoife"), created.id).await.is_ok());
        assert!(svc.get(&Requester::admin("root"), created.id).await.is_ok());
        assert_eq!(
            svc.get(&Requester::user("brian"), created.id).await,
            Err(ReturnServiceError::Forbidden(AccessDenied {
                action: ReturnAction::View
            }))
        );
    }

    #[tokio::test]
    async fn get_missing_return_is_not_found() {
        let repo = MemoryRepository::default();

        assert_eq!(
            service(&repo).get(&Requester::user("aoife"), 42).await,
            Err(ReturnServiceError::NotFound)
        );
    }

    // =========================================================================
    // list
    // =========================================================================
    #[tokio::test]
    async fn list_is_limited_to_self_or_admin() {
        let repo = MemoryRepository::default();
        let svc = service(&repo);
        let aoife = Requester::user("aoife");
        svc.create(&aoife, fields(dec!(40000), 2022)).await.unwrap();
        svc.create(&aoife, fields(dec!(45000), 2023)).await.unwrap();
        svc.create(&Requester::user("brian"), fields(dec!(1), 2023))
            .await
            .unwrap();

        let own = svc.list_for_owner(&aoife, "aoife").await.unwrap();
        assert_eq!(own.iter().map(|r| r.year).collect::<Vec<_>>(), vec![2023, 2022]);

        let as_admin = svc
            .list_for_owner(&Requester::admin("root"), "aoife")
            .await
            .unwrap();
        assert_eq!(as_admin.len(), 2);

        assert!(matches!(
            svc.list_for_owner(&Requester::user("brian"), "aoife").await,
            Err(ReturnServiceError::Forbidden(_))
        ));
    }

    // =========================================================================
    // update
    // =========================================================================
    #[tokio::test]
    async fn owner_can_update() {
        let repo = MemoryRepository::default();
        let svc = service(&repo);
        let aoife = Requester::user("aoife");
        let created = svc.create(&aoife, fields(dec!(50000), 2023)).await.unwrap();

        let updated = svc
            .update(&aoife, created.id, fields(dec!(65000), 2024))
            .await
            .expect("owner update should succeed");

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.owner_id, "aoife");
        assert_eq!(updated.income, dec!(65000));
        assert_eq!(updated.year, 2024);
    }

    #[tokio::test]
    async fn admin_cannot_update_someone_elses_return() {
        let repo = MemoryRepository::default();
        let svc = service(&repo);
        let created = svc
            .create(&Requester::user("aoife"), fields(dec!(50000), 2023))
            .await
            .unwrap();

        let result = svc
            .update(&Requester::admin("root"), created.id, fields(dec!(1), 2023))
            .await;

        assert_eq!(
            result,
            Err(ReturnServiceError::Forbidden(AccessDenied {
                action: ReturnAction::Update
            }))
        );
        assert_eq!(repo.get_return(created.id).await.unwrap().income, dec!(50000));
    }

    // =========================================================================
    // delete
    // =========================================================================
    #[tokio::test]
    async fn stranger_cannot_delete_but_admin_can() {
        let repo = MemoryRepository::default();
        let svc = service(&repo);
        let created = svc
            .create(&Requester::user("aoife"), fields(dec!(50000), 2023))
            .await
            .unwrap();

        assert!(matches!(
            svc.delete(&Requester::user("brian"), created.id).await,
            Err(ReturnServiceError::Forbidden(_))
        ));
        svc.delete(&Requester::admin("root"), created.id)
            .await
            .expect("admin delete should succeed");

        assert_eq!(
            repo.get_return(created.id).await,
            Err(RepositoryError::NotFound)
        );
    }

    // =========================================================================
    // assess
    // =========================================================================
    #[tokio::test]
    async fn assess_computes_liability_for_saved_return() {
        let repo = MemoryRepository::default();
        let svc = service(&repo);
        let aoife = Requester::user("aoife");
        let created = svc.create(&aoife, fields(dec!(50000), 2023)).await.unwrap();

        let assessment = svc.assess(&aoife, created.id).await.unwrap();

        assert_eq!(assessment.tax_return, created);
        assert_eq!(assessment.liability.total_tax_liability, dec!(10817.0));
        assert_eq!(assessment.liability.effective_tax_rate_display(), "21.63");
    }

    #[tokio::test]
    async fn assess_uses_stored_rates_for_the_return_year() {
        let repo = MemoryRepository::default();
        let mut rates_2024 = RateTable::irish_2023();
        rates_2024.tax_year = 2024;
        rates_2024.standard_rate_cutoff = dec!(42000);
        repo.upsert_rate_table(&RateTable::irish_2023()).await.unwrap();
        repo.upsert_rate_table(&rates_2024).await.unwrap();

        let svc = TaxReturnService::from_repository(&repo).await.unwrap();
        let aoife = Requester::user("aoife");
        let created = svc
            .create(
                &aoife,
                TaxReturnFields {
                    income: dec!(42000),
                    deductions: Decimal::ZERO,
                    tax_credits: Decimal::ZERO,
                    year: 2024,
                },
            )
            .await
            .unwrap();

        let assessment = svc.assess(&aoife, created.id).await.unwrap();

        assert_eq!(assessment.liability.tax_year, 2024);
        assert_eq!(assessment.liability.tax_at_higher_rate, Decimal::ZERO);
    }

    #[tokio::test]
    async fn empty_store_falls_back_to_builtin_rates() {
        let repo = MemoryRepository::default();

        let svc = TaxReturnService::from_repository(&repo).await.unwrap();

        assert_eq!(svc.schedule(), &RateSchedule::builtin());
    }

    // =========================================================================
    // error mapping
    // =========================================================================
    #[tokio::test]
    async fn repository_failures_surface_as_repository_errors() {
        let repo = BrokenRepository;

        assert_eq!(
            TaxReturnService::from_repository(&repo).await.err(),
            Some(ReturnServiceError::Repository(RepositoryError::Connection(
                "offline".to_string()
            )))
        );

        let svc = TaxReturnService::new(&repo, RateSchedule::builtin());
        assert!(matches!(
            svc.get(&Requester::user("aoife"), 1).await,
            Err(ReturnServiceError::Repository(_))
        ));
    }
}
