//! Account reads: the caller's balance and the credit package catalog.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ports::{
    AccountQuery, CreditLedger, CreditLedgerError, CreditPackageRepository,
    CreditPackageRepositoryError,
};
use crate::domain::{CreditPackage, Error, UserAccount, UserId};

fn map_ledger_error(error: CreditLedgerError) -> Error {
    match error {
        CreditLedgerError::Connection { message } => {
            Error::service_unavailable(format!("credit ledger unavailable: {message}"))
        }
        CreditLedgerError::UnknownAccount { user_id } => {
            Error::not_found(format!("no account for user {user_id}"))
        }
        other => Error::internal(format!("credit ledger error: {other}")),
    }
}

fn map_package_error(error: CreditPackageRepositoryError) -> Error {
    match error {
        CreditPackageRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("credit package catalog unavailable: {message}"))
        }
        CreditPackageRepositoryError::Query { message } => {
            Error::internal(format!("credit package catalog error: {message}"))
        }
    }
}

/// Account service implementing [`AccountQuery`].
#[derive(Clone)]
pub struct AccountService {
    ledger: Arc<dyn CreditLedger>,
    packages: Arc<dyn CreditPackageRepository>,
}

impl AccountService {
    /// Create the service over a ledger and a package catalog.
    pub fn new(ledger: Arc<dyn CreditLedger>, packages: Arc<dyn CreditPackageRepository>) -> Self {
        Self { ledger, packages }
    }
}

#[async_trait]
impl AccountQuery for AccountService {
    async fn current_account(&self, user_id: &UserId) -> Result<UserAccount, Error> {
        let credits = self
            .ledger
            .balance(user_id)
            .await
            .map_err(map_ledger_error)?
            .ok_or_else(|| Error::not_found(format!("no account for user {user_id}")))?;
        Ok(UserAccount {
            id: user_id.clone(),
            credits,
        })
    }

    async fn credit_packages(&self) -> Result<Vec<CreditPackage>, Error> {
        let mut packages = self.packages.list().await.map_err(map_package_error)?;
        packages.sort_by_key(|package| (package.credits, package.price_cents));
        Ok(packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{MockCreditLedger, MockCreditPackageRepository};
    use rstest::rstest;
    use uuid::Uuid;

    fn package(credits: u32, price_cents: u32) -> CreditPackage {
        CreditPackage {
            id: Uuid::new_v4(),
            credits,
            bonus: 0,
            price_cents,
        }
    }

    fn service(ledger: MockCreditLedger, packages: MockCreditPackageRepository) -> AccountService {
        AccountService::new(Arc::new(ledger), Arc::new(packages))
    }

    #[rstest]
    #[tokio::test]
    async fn current_account_reports_balance() {
        let mut ledger = MockCreditLedger::new();
        ledger.expect_balance().return_once(|_| Ok(Some(15)));
        let user = UserId::random();

        let account = service(ledger, MockCreditPackageRepository::new())
            .current_account(&user)
            .await
            .expect("account");

        assert_eq!(account, UserAccount { id: user, credits: 15 });
    }

    #[rstest]
    #[case::missing(Ok(None), ErrorCode::NotFound)]
    #[case::unknown(
        Err(CreditLedgerError::unknown_account("someone")),
        ErrorCode::NotFound
    )]
    #[case::offline(
        Err(CreditLedgerError::connection("refused")),
        ErrorCode::ServiceUnavailable
    )]
    #[tokio::test]
    async fn current_account_maps_ledger_outcomes(
        #[case] outcome: Result<Option<u32>, CreditLedgerError>,
        #[case] expected: ErrorCode,
    ) {
        let mut ledger = MockCreditLedger::new();
        ledger.expect_balance().return_once(move |_| outcome);

        let error = service(ledger, MockCreditPackageRepository::new())
            .current_account(&UserId::random())
            .await
            .expect_err("lookup fails");

        assert_eq!(error.code(), expected);
    }

    #[rstest]
    #[tokio::test]
    async fn packages_are_sorted_by_credits() {
        let mut packages = MockCreditPackageRepository::new();
        packages
            .expect_list()
            .return_once(|| Ok(vec![package(100, 4000), package(10, 500), package(50, 2000)]));

        let listed = service(MockCreditLedger::new(), packages)
            .credit_packages()
            .await
            .expect("packages");

        let credits: Vec<_> = listed.iter().map(|package| package.credits).collect();
        assert_eq!(credits, vec![10, 50, 100]);
    }

    #[rstest]
    #[tokio::test]
    async fn package_query_failure_is_internal() {
        let mut packages = MockCreditPackageRepository::new();
        packages
            .expect_list()
            .return_once(|| Err(CreditPackageRepositoryError::query("syntax error")));

        let error = service(MockCreditLedger::new(), packages)
            .credit_packages()
            .await
            .expect_err("query fails");

        assert_eq!(error.code(), ErrorCode::InternalError);
    }
}
