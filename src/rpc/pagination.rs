//! Next-key pagination over the RPC surface

use crate::error::RelayResult;
use crate::rpc::Page;
use crate::util::check_cancelled;

use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Walk every page of a paginated query and concatenate the results in order.
///
/// `fetch_page` receives the next-key cursor (empty on the first call) and is
/// invoked until it returns a page with an empty next-key. Cancellation is
/// checked between pages; the total number of iterations is bounded only by
/// the remote returning an empty cursor.
pub async fn fetch_all_pages<T, F, Fut>(
    ctx: &CancellationToken,
    noun: &str,
    mut fetch_page: F,
) -> RelayResult<Vec<T>>
where
    F: FnMut(Vec<u8>) -> Fut,
    Fut: Future<Output = RelayResult<Page<T>>>,
{
    let mut items = Vec::new();
    let mut next_key = Vec::new();

    loop {
        check_cancelled(ctx)?;

        let page = fetch_page(next_key).await?;
        tracing::debug!(
            "fetched page of {}: {} in page, {} total",
            noun,
            page.items.len(),
            items.len() + page.items.len()
        );
        items.extend(page.items);

        if page.next_key.is_empty() {
            break;
        }
        next_key = page.next_key;
    }

    Ok(items)
}
