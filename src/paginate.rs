use crate::error::Error;
use futures::future::BoxFuture;

/// One page of a remote listing.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Page<T> {
    pub(crate) items: Vec<T>,
    pub(crate) next_token: Option<String>,
}

impl<T> Page<T> {
    pub(crate) fn new(items: Vec<T>, next_token: Option<String>) -> Self {
        Self { items, next_token }
    }
}

/// Items accumulated across pages, along with the error that stopped the
/// aggregation early, if any.
#[derive(Debug)]
pub(crate) struct Listing<T> {
    pub(crate) items: Vec<T>,
    pub(crate) error: Option<Error>,
}

impl<T> Listing<T> {
    /// Drop any partial result if a page failed.
    pub(crate) fn into_result(self) -> Result<Vec<T>, Error> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.items),
        }
    }
}

/// Follow continuation tokens until the server stops returning one,
/// keeping the pages in the order the server delivered them.
pub(crate) async fn paginate<'a, T, F>(mut fetch: F) -> Listing<T>
where
    F: FnMut(Option<String>) -> BoxFuture<'a, Result<Page<T>, Error>>,
{
    let mut items = Vec::new();
    let mut next_token: Option<String> = None;
    loop {
        tracing::debug!(next_token = ?next_token, "fetching page");
        match fetch(next_token.take()).await {
            Ok(page) => {
                items.extend(page.items);
                match page.next_token {
                    Some(token) => next_token = Some(token),
                    None => break,
                }
            }
            Err(e) => {
                tracing::debug!(nitems = items.len(), err = %e, "page fetch failed");
                return Listing {
                    items,
                    error: Some(e),
                };
            }
        }
    }
    tracing::debug!(nitems = items.len(), "reached last page");
    Listing { items, error: None }
}
