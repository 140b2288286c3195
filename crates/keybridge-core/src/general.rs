use crate::{Authentication, Error, IdpClient, ProxyAuthorizationCode, Transaction};
use oauth2::{EndpointMaybeSet, EndpointNotSet, EndpointSet, Scope};
use std::future::Future;
use url::Url;

pub trait GeneralAuthn {
    fn create_oauth_client(
        &self,
    ) -> IdpClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointMaybeSet>;

    /// Issuer spelling suitable for client-facing metadata.
    fn issuer_url(&self) -> Url;

    /// JWKS document location, also in its client-facing spelling.
    fn jwks_url(&self) -> Url;

    fn scopes(&self) -> Vec<Scope>;

    fn authenticate(
        &self,
        target: &http::request::Parts,
    ) -> impl Future<Output = Result<Authentication, Error>>;
}

pub trait GeneralFlowStore {
    fn insert_transaction(
        &self,
        txn: Transaction,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes and returns the transaction. A second take of the same id
    /// observes `None`, as does a take after the entry expired.
    fn take_transaction(
        &self,
        txn_id: &str,
    ) -> impl Future<Output = Result<Option<Transaction>, Error>> + Send;

    fn insert_code(
        &self,
        code: ProxyAuthorizationCode,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Same contract as [`GeneralFlowStore::take_transaction`]: at most one
    /// caller ever obtains a given code.
    fn take_code(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<ProxyAuthorizationCode>, Error>> + Send;
}
