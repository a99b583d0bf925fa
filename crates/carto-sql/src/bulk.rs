//! Bulk loading of GeoJSON-like features.
//!
//! Features are buffered into chunks of `batch_size` rows, and each chunk
//! becomes one multi-row insert. At most `max_in_progress` inserts are
//! outstanding; while the cap is reached no further input is pulled.

use std::collections::BTreeMap;

use carto_sql_core::builder::{table as table_ref, Record};
use carto_sql_core::{Geometry, SchemaBuilder, SqlValue};
use futures::stream::{FuturesUnordered, Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, info};

use crate::client::Client;
use crate::error::{Error, Result};

/// Column that receives a feature's geometry.
pub const GEOMETRY_COLUMN: &str = "the_geom";

const DEFAULT_BATCH_SIZE: usize = 50;
const DEFAULT_MAX_IN_PROGRESS: usize = 10;

/// A row to load: flat properties plus an optional geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feature {
    pub properties: BTreeMap<String, SqlValue>,
    pub geometry: Option<Geometry>,
}

impl Feature {
    #[must_use]
    pub const fn new(properties: BTreeMap<String, SqlValue>, geometry: Option<Geometry>) -> Self {
        Self {
            properties,
            geometry,
        }
    }

    /// Reads a GeoJSON `Feature` object.
    ///
    /// # Errors
    ///
    /// [`Error::Decode`] if `value` is not a feature or its geometry is not a
    /// GeoJSON geometry.
    pub fn from_geojson(value: Value) -> Result<Self> {
        let Value::Object(mut object) = value else {
            return Err(Error::Decode(String::from("feature is not an object")));
        };
        if object.get("type").and_then(Value::as_str) != Some("Feature") {
            return Err(Error::Decode(String::from("object is not a GeoJSON Feature")));
        }
        let properties = match object.remove("properties") {
            Some(Value::Object(map)) => map
                .into_iter()
                .map(|(key, value)| (key, SqlValue::from(value)))
                .collect(),
            None | Some(Value::Null) => BTreeMap::new(),
            Some(_) => return Err(Error::Decode(String::from("feature properties are not an object"))),
        };
        let geometry = match object.remove("geometry") {
            None | Some(Value::Null) => None,
            Some(geojson) => Some(Geometry::try_from(geojson).map_err(|g| {
                Error::Decode(format!("feature geometry is not a GeoJSON geometry: {g}"))
            })?),
        };
        Ok(Self::new(properties, geometry))
    }

    /// Flattens the feature into an insert record.
    #[must_use]
    pub fn into_record(self) -> Record {
        let mut record = self.properties;
        record.insert(
            String::from(GEOMETRY_COLUMN),
            self.geometry.map_or(SqlValue::Null, SqlValue::Geometry),
        );
        record
    }
}

/// Reads a `FeatureCollection`, or a single `Feature`.
///
/// # Errors
///
/// [`Error::Decode`] if the document is neither, or any feature is invalid.
pub fn features_from_geojson(value: Value) -> Result<Vec<Feature>> {
    match value.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => match value.get("features") {
            Some(Value::Array(features)) => features
                .iter()
                .cloned()
                .map(Feature::from_geojson)
                .collect(),
            _ => Err(Error::Decode(String::from("feature collection has no features array"))),
        },
        Some("Feature") => Ok(vec![Feature::from_geojson(value)?]),
        _ => Err(Error::Decode(String::from(
            "document is not a GeoJSON Feature or FeatureCollection",
        ))),
    }
}

/// Tuning for [`Client::bulk_insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkOptions {
    /// Rows per insert.
    pub batch_size: usize,
    /// Inserts allowed in flight at once.
    pub max_in_progress: usize,
    /// Create the table from the first feature before loading.
    pub create: bool,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_in_progress: DEFAULT_MAX_IN_PROGRESS,
            create: false,
        }
    }
}

impl BulkOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    #[must_use]
    pub const fn max_in_progress(mut self, max: usize) -> Self {
        self.max_in_progress = max;
        self
    }

    #[must_use]
    pub const fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }
}

/// Outcome of a completed bulk load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkSummary {
    /// Rows inserted.
    pub rows: usize,
    /// Insert statements executed.
    pub chunks: usize,
    pub table_created: bool,
}

/// Schema for a new table, one column per property of `feature`.
///
/// Geometry is not declared; finalizing the table adds `the_geom`.
#[must_use]
pub fn infer_schema(table: &str, feature: &Feature) -> SchemaBuilder {
    SchemaBuilder::new().create_table(table, |t| {
        for (name, value) in &feature.properties {
            match value {
                SqlValue::Int(_) | SqlValue::Float(_) => {
                    t.float(name);
                }
                SqlValue::Bool(_) => {
                    t.boolean(name);
                }
                SqlValue::Timestamp(_) => {
                    t.timestamp(name, true);
                }
                _ => {
                    t.text(name);
                }
            }
        }
    })
}

async fn insert_chunk(client: &Client, table: &str, rows: Vec<Record>) -> Result<usize> {
    let count = rows.len();
    client.query(table_ref(table).insert_many(rows).build()).await?;
    Ok(count)
}

/// Runs the load loop behind [`Client::bulk_insert`].
pub(crate) async fn load<S>(
    client: &Client,
    table: &str,
    features: S,
    options: BulkOptions,
) -> Result<BulkSummary>
where
    S: Stream<Item = Feature>,
{
    let batch_size = options.batch_size.max(1);
    let max_in_progress = options.max_in_progress.max(1);
    let mut features = std::pin::pin!(features);
    let mut in_flight = FuturesUnordered::new();
    let mut buffer: Vec<Record> = Vec::with_capacity(batch_size);
    let mut summary = BulkSummary::default();
    let mut needs_table = options.create;
    let mut input_done = false;
    let mut failure: Option<Error> = None;

    loop {
        tokio::select! {
            biased;

            Some(done) = in_flight.next(), if !in_flight.is_empty() => match done {
                Ok(rows) => {
                    summary.rows += rows;
                    summary.chunks += 1;
                    debug!(table, rows, in_flight = in_flight.len(), "chunk inserted");
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            },

            next = features.next(), if !input_done && in_flight.len() < max_in_progress => {
                match next {
                    Some(feature) => {
                        if needs_table {
                            client.query(infer_schema(table, &feature).build()).await?;
                            needs_table = false;
                            summary.table_created = true;
                        }
                        buffer.push(feature.into_record());
                        if buffer.len() < batch_size {
                            continue;
                        }
                    }
                    None => {
                        input_done = true;
                        if buffer.is_empty() {
                            continue;
                        }
                    }
                }
                let rows = std::mem::replace(&mut buffer, Vec::with_capacity(batch_size));
                debug!(table, rows = rows.len(), in_flight = in_flight.len() + 1, "dispatching chunk");
                in_flight.push(insert_chunk(client, table, rows));
            }

            else => break,
        }
    }

    if let Some(err) = failure {
        // Let outstanding inserts finish; only the first error is reported.
        while in_flight.next().await.is_some() {}
        return Err(err);
    }

    info!(table, rows = summary.rows, chunks = summary.chunks, "bulk insert finished");
    Ok(summary)
}
