//! Operation layer over the request executor.
//!
//! # Design
//! `PleasanterClient` holds only immutable state: the `Connection`, the
//! payload template and an `Executor` wrapping the transport. Each operation
//! builds a fresh payload, issues one request per page through the executor
//! and reshapes the envelope into a typed result. Response shapes are checked
//! by the `parse_*` functions, which are pure and tested without a transport.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::Connection;
use crate::envelope::Page;
use crate::error::{ApiError, ErrorKind};
use crate::executor::Executor;
use crate::http::Transport;
use crate::payload::{PayloadTemplate, SearchType, View};
use crate::site::SiteInfo;
use crate::transport::UreqTransport;

/// A record as the platform returns it. Not validated.
pub type Record = Value;

/// Optional restrictions for [`PleasanterClient::list_records`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordQuery {
    pub columns: Option<Vec<String>>,
    pub filters: Option<Map<String, Value>>,
    pub search_types: Option<BTreeMap<String, SearchType>>,
}

impl RecordQuery {
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn filter(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters
            .get_or_insert_with(Map::new)
            .insert(column.into(), value.into());
        self
    }

    pub fn search_types(mut self, search_types: BTreeMap<String, SearchType>) -> Self {
        self.search_types = Some(search_types);
        self
    }

    fn view(&self) -> View {
        View {
            grid_columns: self.columns.clone(),
            column_filter_hash: self.filters.clone(),
            column_filter_search_types: self.search_types.clone(),
            ..View::default()
        }
    }
}

/// One page of a paginated `/get`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordsPage {
    pub records: Vec<Record>,
    pub page_size: u64,
    pub total_count: u64,
}

#[derive(Debug, Clone)]
pub struct PleasanterClient<T = UreqTransport> {
    connection: Connection,
    payload: PayloadTemplate,
    executor: Executor<T>,
}

impl PleasanterClient<UreqTransport> {
    /// Client over a blocking ureq transport using the connection's timeouts.
    pub fn new(connection: Connection) -> Self {
        let transport = UreqTransport::new(connection.timeouts());
        Self::with_transport(connection, transport)
    }
}

impl<T: Transport> PleasanterClient<T> {
    pub fn with_transport(connection: Connection, transport: T) -> Self {
        Self {
            payload: PayloadTemplate::new(connection.api_key()),
            executor: Executor::new(transport),
            connection,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn transport(&self) -> &T {
        self.executor.transport()
    }

    /// Internal column name to display label for a record table.
    pub fn site_column_mapping(&self, site_id: &str) -> Result<BTreeMap<String, String>, ApiError> {
        Ok(self.fetch_site(site_id)?.column_mapping())
    }

    /// Columns on the "General" editor tab plus the system columns.
    pub fn editable_columns(&self, site_id: &str) -> Result<Vec<String>, ApiError> {
        Ok(self.fetch_site(site_id)?.editable_columns())
    }

    /// Fetch exactly one record. Fails with `InvalidId` when the ids are empty
    /// or equal (no request is sent), or when `record_id` does not resolve to
    /// a single record.
    pub fn record_by_id(
        &self,
        site_id: &str,
        record_id: &str,
        columns: Option<&[String]>,
    ) -> Result<Record, ApiError> {
        require_id(site_id)?;
        require_id(record_id)?;
        if site_id == record_id {
            return Err(ApiError::invalid_id("same value used for both record and site id"));
        }

        let view = View {
            grid_columns: columns.map(<[String]>::to_vec),
            ..View::default()
        };
        let payload = self.payload.with_view(&view, None)?;
        let page = self.post(record_id, "get", &payload)?;
        parse_single_record(page)
    }

    /// Fetch every record of a table, one page at a time.
    ///
    /// The page size is read from each response. Any failed page aborts the
    /// whole listing with that page's error; records fetched so far are
    /// dropped.
    pub fn list_records(&self, site_id: &str, query: &RecordQuery) -> Result<Vec<Record>, ApiError> {
        require_id(site_id)?;
        let url = self.connection.item_url(site_id, "get");
        let view = query.view();

        let mut records = Vec::new();
        let mut offset = 0;
        loop {
            let payload = self.payload.with_view(&view, Some(offset))?;
            let page = self
                .executor
                .send(&url, &payload)
                .into_result()
                .and_then(parse_records_page)
                .inspect_err(|err| {
                    warn!(site_id, offset, fetched = records.len(), %err, "listing aborted");
                })?;

            let total = page.total_count;
            let page_size = page.page_size;
            records.extend(page.records);
            offset = offset.checked_add(page_size).ok_or_else(|| {
                ApiError::new(
                    ErrorKind::IncompleteOperation,
                    format!("page size {page_size} overflows offset {offset}"),
                )
            })?;
            debug!(site_id, offset, total, fetched = records.len(), "fetched page");

            if offset >= total {
                if records.len() as u64 != total {
                    return Err(ApiError::new(
                        ErrorKind::IncompleteOperation,
                        format!("retrieved {} of {total} records", records.len()),
                    ));
                }
                return Ok(records);
            }
            if page_size == 0 {
                return Err(ApiError::new(
                    ErrorKind::IncompleteOperation,
                    format!("server reported page size 0 at offset {offset} of {total}"),
                ));
            }
        }
    }

    /// Create a record in `site_id` from `fields`.
    ///
    /// Nothing checks that `site_id` names a table rather than an existing
    /// record; callers must pass a table id.
    pub fn insert_record(&self, site_id: &str, fields: &Map<String, Value>) -> Result<(), ApiError> {
        require_id(site_id)?;
        self.post(site_id, "create", &self.payload.with_fields(fields))?;
        Ok(())
    }

    pub fn update_record(&self, record_id: &str, fields: &Map<String, Value>) -> Result<(), ApiError> {
        require_id(record_id)?;
        self.post(record_id, "update", &self.payload.with_fields(fields))?;
        Ok(())
    }

    fn fetch_site(&self, site_id: &str) -> Result<SiteInfo, ApiError> {
        require_id(site_id)?;
        let page = self.post(site_id, "getsite", &self.payload.base())?;
        SiteInfo::parse_record_table(page.data)
    }

    fn post(&self, id: &str, action: &str, payload: &Map<String, Value>) -> Result<Page, ApiError> {
        self.executor
            .send(&self.connection.item_url(id, action), payload)
            .into_result()
    }
}

fn require_id(id: &str) -> Result<(), ApiError> {
    if id.trim().is_empty() {
        return Err(ApiError::invalid_id("empty id"));
    }
    Ok(())
}

/// A record fetch must yield a list holding exactly one record.
pub fn parse_single_record(page: Page) -> Result<Record, ApiError> {
    match page.data {
        Some(Value::Array(mut items)) if items.len() == 1 => Ok(items.remove(0)),
        _ => Err(ApiError::invalid_id("id refers to a site or folder, not a record")),
    }
}

/// Validate one page of a paginated listing.
///
/// A mapping-shaped `Data` means the id is a folder. `TotalCount` and
/// `PageSize` must be present.
pub fn parse_records_page(page: Page) -> Result<RecordsPage, ApiError> {
    let records = match page.data {
        Some(Value::Array(items)) => items,
        Some(Value::Object(_)) => {
            return Err(ApiError::invalid_id("id refers to a folder, not a record table"));
        }
        _ => {
            return Err(ApiError::new(
                ErrorKind::Unexpected("InvalidDataShape".into()),
                "listing response carried no record list",
            ));
        }
    };
    let missing = |field: &str| {
        ApiError::new(
            ErrorKind::Unexpected("MissingPagination".into()),
            format!("listing response carried no {field}"),
        )
    };
    Ok(RecordsPage {
        records,
        page_size: page.page_size.ok_or_else(|| missing("PageSize"))?,
        total_count: page.total_count.ok_or_else(|| missing("TotalCount"))?,
    })
}
