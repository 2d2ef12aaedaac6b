//! One sandbox iteration: exercise every attribute kind of an entity and
//! read the results back.

use adl_client::{AdlClient, AdlResult, ListItem, Projection, RequestContext};
use tracing::debug;

pub const PROPERTY: &str = "propX";
pub const SECOND_PROPERTY: &str = "propY";
pub const LIST: &str = "TESTLIST";
pub const BASE_VALUE: &str = "this is data!";
pub const META_VALUE: &str = "this is meta";
pub const SECOND_VALUE: &str = "This is Y data";

const SET_MEMBERS: [&str; 3] = ["test1", "test2", "test3"];
const LIST_ITEMS: [(&str, &str); 4] = [("1", "ONE"), ("2", "TWO"), ("3", "THREE"), ("4", "FOUR")];

/// Values read back at the end of an iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationReport {
    /// Counter value seen before this iteration's increment.
    pub previous_count: i64,
    pub applied: usize,
    pub property: String,
    pub second_property: String,
    pub metadata: String,
    pub counter: i64,
    pub set: Vec<String>,
    pub list: Vec<ListItem>,
}

/// `propX` value written for a given counter reading.
pub fn property_value(count: i64) -> String {
    let bangs = usize::try_from(count).unwrap_or(0);
    format!("{BASE_VALUE}{}", "!".repeat(bangs))
}

/// Reads the counter, stages one write of every kind, commits and reads
/// everything back.
pub async fn run_iteration(
    client: &AdlClient,
    ctx: &RequestContext,
    entity_id: &str,
) -> AdlResult<IterationReport> {
    let mut entity = client.entity(entity_id);

    entity.read(ctx, [Projection::counter(PROPERTY)]).await?;
    let previous_count = entity.counter(PROPERTY);

    entity.write_property(PROPERTY, property_value(previous_count));
    entity.write_metadata(PROPERTY, META_VALUE);
    for member in SET_MEMBERS {
        entity.add_set_item(PROPERTY, member);
    }
    for (key, value) in LIST_ITEMS {
        entity.add_list_item(LIST, key, value);
    }
    entity.increment_counter(PROPERTY);
    entity.write_property(SECOND_PROPERTY, SECOND_VALUE);

    let receipt = entity.commit(ctx).await?;
    debug!(entity = entity_id, applied = receipt.applied, "sandbox commit done");

    entity
        .read(
            ctx,
            [
                Projection::properties_with_prefix("prop"),
                Projection::metadata(PROPERTY),
                Projection::counter(PROPERTY),
                Projection::set(PROPERTY),
                Projection::list_range(LIST, "1", "", 0),
            ],
        )
        .await?;

    Ok(IterationReport {
        previous_count,
        applied: receipt.applied,
        property: entity.property(PROPERTY).to_string(),
        second_property: entity.property(SECOND_PROPERTY).to_string(),
        metadata: entity.metadata(PROPERTY).to_string(),
        counter: entity.counter(PROPERTY),
        set: entity.set(PROPERTY).into_iter().map(String::from).collect(),
        list: entity.list(LIST).to_vec(),
    })
}
