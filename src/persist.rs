// used for persistence
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

// used to keep the one-to-one mapping between pages and their assigned ids
use bimap::BiMap;
use chrono::NaiveDateTime;

use std::sync::Mutex;
use tracing::{debug, info, trace};

use crate::datatype::{DataItem, DataItemKind, Decimal, Record, WikiPage, NS_PROPERTY, TIME_FORMAT};
use crate::error::{CellfinderError, Result};
use crate::options::{RequestOptions, SortDirection};
use crate::property::{Property, INSTANCE_OF};
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceMode {
    InMemory,
    File(String),
}

// ------------- Property tables -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyTable {
    name: &'static str,
    kind: DataItemKind,
    fixed_property: Option<&'static str>,
}

impl PropertyTable {
    pub fn name(&self) -> &'static str {
        self.name
    }
    pub fn kind(&self) -> DataItemKind {
        self.kind
    }
    // fixed tables hold a single property and have no p_id column
    pub fn fixed_property(&self) -> Option<&'static str> {
        self.fixed_property
    }
    pub fn is_fixed(&self) -> bool {
        self.fixed_property.is_some()
    }
    fn value_column(&self) -> &'static str {
        match self.kind {
            DataItemKind::WikiPage => "o_id",
            DataItemKind::Blob => "o_blob",
            DataItemKind::Number | DataItemKind::Time => "o_serialized",
            DataItemKind::Boolean => "o_value",
            DataItemKind::Record => "o_components",
        }
    }
    fn sort_column(&self) -> &'static str {
        match self.kind {
            DataItemKind::WikiPage => "o.smw_sortkey",
            DataItemKind::Blob => "v.o_blob",
            DataItemKind::Number | DataItemKind::Record => "v.o_sortkey",
            DataItemKind::Boolean => "v.o_value",
            DataItemKind::Time => "v.o_serialized",
        }
    }
}

const PROPERTY_TABLES: [PropertyTable; 7] = [
    PropertyTable { name: "smw_fpt_inst", kind: DataItemKind::WikiPage, fixed_property: Some(INSTANCE_OF) },
    PropertyTable { name: "smw_di_wikipage", kind: DataItemKind::WikiPage, fixed_property: None },
    PropertyTable { name: "smw_di_blob", kind: DataItemKind::Blob, fixed_property: None },
    PropertyTable { name: "smw_di_number", kind: DataItemKind::Number, fixed_property: None },
    PropertyTable { name: "smw_di_bool", kind: DataItemKind::Boolean, fixed_property: None },
    PropertyTable { name: "smw_di_time", kind: DataItemKind::Time, fixed_property: None },
    PropertyTable { name: "smw_di_record", kind: DataItemKind::Record, fixed_property: None },
];

fn fixed_table(property: &Property) -> Option<&'static PropertyTable> {
    PROPERTY_TABLES
        .iter()
        .find(|t| t.fixed_property == Some(property.key()))
}

fn table_of_kind(kind: DataItemKind) -> &'static PropertyTable {
    // every kind has exactly one general table
    PROPERTY_TABLES
        .iter()
        .find(|t| !t.is_fixed() && t.kind == kind)
        .unwrap_or(&PROPERTY_TABLES[1])
}

// properties are pages too, in their own namespace
fn property_page(property: &Property) -> WikiPage {
    WikiPage::from_parts(property.key().to_string(), NS_PROPERTY, String::new(), String::new())
}

fn conversion_failure<E: std::error::Error + Send + Sync + 'static>(e: E) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
}

fn decode(kind: DataItemKind, row: &Row) -> rusqlite::Result<DataItem> {
    Ok(match kind {
        DataItemKind::WikiPage => DataItem::WikiPage(WikiPage::from_parts(
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
        )),
        DataItemKind::Blob => DataItem::Blob(row.get(0)?),
        DataItemKind::Number => DataItem::Number(row.get::<_, Decimal>(0)?),
        DataItemKind::Boolean => DataItem::Boolean(row.get(0)?),
        DataItemKind::Time => {
            let text: String = row.get(0)?;
            DataItem::Time(NaiveDateTime::parse_from_str(&text, TIME_FORMAT).map_err(conversion_failure)?)
        }
        DataItemKind::Record => {
            let text: String = row.get(0)?;
            DataItem::Record(serde_json::from_str::<Record>(&text).map_err(conversion_failure)?)
        }
    })
}

// ------------- Persistence -------------
struct Inner {
    connection: Connection,
    ids: BiMap<WikiPage, i64>,
}

impl Inner {
    fn page_id(&mut self, page: &WikiPage) -> Result<Option<i64>> {
        if let Some(id) = self.ids.get_by_left(page) {
            return Ok(Some(*id));
        }
        let id: Option<i64> = self
            .connection
            .prepare_cached(
                "
                select smw_id
                    from smw_object_ids
                    where smw_title = ?1
                    and smw_namespace = ?2
                    and smw_iw = ?3
                    and smw_subobject = ?4
            ",
            )?
            .query_row(
                params![page.db_key(), page.namespace(), page.interwiki(), page.subobject()],
                |r| r.get(0),
            )
            .optional()?;
        if let Some(id) = id {
            self.ids.insert(page.clone(), id);
        }
        Ok(id)
    }
    fn ensure_page_id(&mut self, page: &WikiPage) -> Result<i64> {
        if let Some(id) = self.page_id(page)? {
            return Ok(id);
        }
        self.connection
            .prepare_cached(
                "
                insert into smw_object_ids (
                    smw_title,
                    smw_namespace,
                    smw_iw,
                    smw_subobject,
                    smw_sortkey
                ) values (?1, ?2, ?3, ?4, ?5)
            ",
            )?
            .execute(params![
                page.db_key(),
                page.namespace(),
                page.interwiki(),
                page.subobject(),
                page.sort_key()
            ])?;
        let id = self.connection.last_insert_rowid();
        trace!(page = %page, id, "new object id");
        self.ids.insert(page.clone(), id);
        Ok(id)
    }
    fn property_kind(&mut self, p_id: i64) -> Result<Option<DataItemKind>> {
        let uid: Option<u8> = self
            .connection
            .prepare_cached("select kind from smw_property_kind where p_id = ?1")?
            .query_row(params![p_id], |r| r.get(0))
            .optional()?;
        match uid {
            None => Ok(None),
            Some(uid) => DataItemKind::from_uid(uid)
                .map(Some)
                .ok_or_else(|| CellfinderError::DataCorruption {
                    message: format!("unknown kind {} for property id {}", uid, p_id),
                }),
        }
    }
    // Read only, so that a rejected value leaves no rows behind.
    fn check_property_kind(&mut self, property: &Property, kind: DataItemKind) -> Result<()> {
        let p_id = match self.page_id(&property_page(property))? {
            Some(p_id) => p_id,
            None => return Ok(()),
        };
        match self.property_kind(p_id)? {
            Some(stored) if stored != kind => Err(CellfinderError::TypeMismatch {
                property: property.key().to_string(),
                stored: stored.to_string(),
                given: kind.to_string(),
            }),
            _ => Ok(()),
        }
    }
    // The kind of the first value decides the table of a property. Callers
    // run check_property_kind first.
    fn bind_property_kind(&mut self, property: &Property, kind: DataItemKind) -> Result<i64> {
        let p_id = self.ensure_page_id(&property_page(property))?;
        match self.property_kind(p_id)? {
            Some(_) => Ok(p_id),
            None => {
                self.connection
                    .prepare_cached("insert into smw_property_kind (p_id, kind) values (?1, ?2)")?
                    .execute(params![p_id, kind.uid()])?;
                Ok(p_id)
            }
        }
    }
    fn values(
        &mut self,
        table: &PropertyTable,
        id: i64,
        p_id: Option<i64>,
        inverse: bool,
        options: Option<&RequestOptions>,
    ) -> Result<Vec<DataItem>> {
        let mut sql = match (table.kind, inverse) {
            (DataItemKind::WikiPage, false) => format!(
                "select o.smw_title, o.smw_namespace, o.smw_iw, o.smw_subobject from {} v join smw_object_ids o on o.smw_id = v.o_id where v.s_id = ?",
                table.name
            ),
            (DataItemKind::WikiPage, true) => format!(
                "select o.smw_title, o.smw_namespace, o.smw_iw, o.smw_subobject from {} v join smw_object_ids o on o.smw_id = v.s_id where v.o_id = ?",
                table.name
            ),
            (_, true) => return Ok(Vec::new()),
            (_, false) => format!(
                "select v.{} from {} v where v.s_id = ?",
                table.value_column(),
                table.name
            ),
        };
        let mut args: Vec<i64> = vec![id];
        if let Some(p_id) = p_id {
            sql.push_str(" and v.p_id = ?");
            args.push(p_id);
        }
        match options.and_then(RequestOptions::sort) {
            Some(SortDirection::Ascending) => {
                sql.push_str(&format!(" order by {} asc, v.rowid", table.sort_column()))
            }
            Some(SortDirection::Descending) => {
                sql.push_str(&format!(" order by {} desc, v.rowid", table.sort_column()))
            }
            None => sql.push_str(" order by v.rowid"),
        }
        if let Some(limit) = options.and_then(RequestOptions::limit) {
            sql.push_str(" limit ?");
            args.push(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        let mut statement = self.connection.prepare_cached(&sql)?;
        let rows = statement.query_map(params_from_iter(args.iter()), |row| decode(table.kind, row))?;
        let values = rows.collect::<rusqlite::Result<Vec<DataItem>>>()?;
        Ok(values)
    }
}

/// A store keeping values in property tables, one table per kind of value
/// plus fixed tables for special properties, with pages mapped to integer
/// ids.
pub struct SqliteStore {
    inner: Mutex<Inner>,
}

impl SqliteStore {
    pub fn new(mode: PersistenceMode) -> Result<Self> {
        let connection = match &mode {
            PersistenceMode::InMemory => Connection::open_in_memory()?,
            PersistenceMode::File(path) => Connection::open(path)?,
        };
        connection.execute_batch(
            "
            create table if not exists smw_object_ids (
                smw_id integer not null,
                smw_title text not null,
                smw_namespace integer not null,
                smw_iw text not null,
                smw_subobject text not null,
                smw_sortkey text not null,
                constraint referenceable_smw_id primary key (
                    smw_id
                ),
                constraint unique_page unique (
                    smw_title,
                    smw_namespace,
                    smw_iw,
                    smw_subobject
                )
            );
            create table if not exists smw_property_kind (
                p_id integer not null,
                kind integer not null,
                constraint property_is_object foreign key (
                    p_id
                ) references smw_object_ids(smw_id),
                constraint referenceable_p_id primary key (
                    p_id
                )
            );
            create table if not exists smw_fpt_inst (
                s_id integer not null,
                o_id integer not null,
                constraint unique_inst unique (
                    s_id,
                    o_id
                )
            );
            create table if not exists smw_di_wikipage (
                s_id integer not null,
                p_id integer not null,
                o_id integer not null,
                constraint unique_wikipage unique (
                    s_id,
                    p_id,
                    o_id
                )
            );
            create index if not exists wikipage_by_object on smw_di_wikipage (
                p_id,
                o_id
            );
            create table if not exists smw_di_blob (
                s_id integer not null,
                p_id integer not null,
                o_blob text not null,
                constraint unique_blob unique (
                    s_id,
                    p_id,
                    o_blob
                )
            );
            create table if not exists smw_di_number (
                s_id integer not null,
                p_id integer not null,
                o_serialized text not null,
                o_sortkey text not null,
                constraint unique_number unique (
                    s_id,
                    p_id,
                    o_serialized
                )
            );
            create table if not exists smw_di_bool (
                s_id integer not null,
                p_id integer not null,
                o_value integer not null,
                constraint unique_bool unique (
                    s_id,
                    p_id,
                    o_value
                )
            );
            create table if not exists smw_di_time (
                s_id integer not null,
                p_id integer not null,
                o_serialized text not null,
                constraint unique_time unique (
                    s_id,
                    p_id,
                    o_serialized
                )
            );
            create table if not exists smw_di_record (
                s_id integer not null,
                p_id integer not null,
                o_components text not null,
                o_sortkey text not null,
                constraint unique_record unique (
                    s_id,
                    p_id,
                    o_components
                )
            );
            ",
        )?;
        info!(?mode, "property tables ready");
        Ok(Self {
            inner: Mutex::new(Inner {
                connection,
                ids: BiMap::new(),
            }),
        })
    }

    pub fn property_tables() -> &'static [PropertyTable] {
        &PROPERTY_TABLES
    }

    /// Stores a value of `property` for `subject`. Returns false when the
    /// value was already there.
    pub fn add_value(&self, subject: &WikiPage, property: &Property, value: &DataItem) -> Result<bool> {
        if property.is_inverse() {
            return Err(CellfinderError::InvalidProperty(format!(
                "values are added through '{}', not its inverse",
                property.key()
            )));
        }
        let mut inner = self.inner.lock()?;
        if let Some(table) = fixed_table(property) {
            let page = match value {
                DataItem::WikiPage(page) if table.kind == DataItemKind::WikiPage => page,
                _ => {
                    return Err(CellfinderError::TypeMismatch {
                        property: property.key().to_string(),
                        stored: table.kind.to_string(),
                        given: value.kind().to_string(),
                    });
                }
            };
            let s_id = inner.ensure_page_id(subject)?;
            let o_id = inner.ensure_page_id(page)?;
            let changed = inner
                .connection
                .prepare_cached(&format!(
                    "insert or ignore into {} (s_id, o_id) values (?1, ?2)",
                    table.name
                ))?
                .execute(params![s_id, o_id])?;
            return Ok(changed > 0);
        }
        inner.check_property_kind(property, value.kind())?;
        let s_id = inner.ensure_page_id(subject)?;
        let p_id = inner.bind_property_kind(property, value.kind())?;
        let table = table_of_kind(value.kind());
        let changed = match value {
            DataItem::WikiPage(page) => {
                let o_id = inner.ensure_page_id(page)?;
                inner
                    .connection
                    .prepare_cached("insert or ignore into smw_di_wikipage (s_id, p_id, o_id) values (?1, ?2, ?3)")?
                    .execute(params![s_id, p_id, o_id])?
            }
            DataItem::Blob(text) => inner
                .connection
                .prepare_cached("insert or ignore into smw_di_blob (s_id, p_id, o_blob) values (?1, ?2, ?3)")?
                .execute(params![s_id, p_id, text])?,
            DataItem::Number(number) => inner
                .connection
                .prepare_cached(
                    "insert or ignore into smw_di_number (s_id, p_id, o_serialized, o_sortkey) values (?1, ?2, ?3, ?4)",
                )?
                .execute(params![s_id, p_id, number, number.ordered_key()])?,
            DataItem::Boolean(flag) => inner
                .connection
                .prepare_cached("insert or ignore into smw_di_bool (s_id, p_id, o_value) values (?1, ?2, ?3)")?
                .execute(params![s_id, p_id, flag])?,
            DataItem::Time(time) => inner
                .connection
                .prepare_cached("insert or ignore into smw_di_time (s_id, p_id, o_serialized) values (?1, ?2, ?3)")?
                .execute(params![s_id, p_id, time.format(TIME_FORMAT).to_string()])?,
            DataItem::Record(record) => inner
                .connection
                .prepare_cached(
                    "insert or ignore into smw_di_record (s_id, p_id, o_components, o_sortkey) values (?1, ?2, ?3, ?4)",
                )?
                .execute(params![s_id, p_id, serde_json::to_string(record)?, record.to_string()])?,
        };
        trace!(subject = %subject, property = %property, table = table.name, changed, "value stored");
        Ok(changed > 0)
    }

    pub fn add_category(&self, subject: &WikiPage, category: &WikiPage) -> Result<bool> {
        self.add_value(subject, &Property::instance_of(), &DataItem::WikiPage(category.clone()))
    }

    /// Empties every table.
    pub fn clear(&self) -> Result<()> {
        let mut inner = self.inner.lock()?;
        for table in PROPERTY_TABLES.iter() {
            inner.connection.execute(&format!("delete from {}", table.name), [])?;
        }
        inner.connection.execute("delete from smw_property_kind", [])?;
        inner.connection.execute("delete from smw_object_ids", [])?;
        inner.ids.clear();
        debug!("store cleared");
        Ok(())
    }
}

impl Store for SqliteStore {
    fn property_values(
        &self,
        subject: &DataItem,
        property: &Property,
        options: Option<&RequestOptions>,
    ) -> Result<Vec<DataItem>> {
        let page = match subject.as_page() {
            Some(page) => page,
            None => return Ok(Vec::new()),
        };
        let mut inner = self.inner.lock()?;
        let id = match inner.page_id(page)? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };
        let (table, p_id) = match fixed_table(property) {
            Some(table) => (table, None),
            None => {
                let p_id = match inner.page_id(&property_page(property))? {
                    Some(p_id) => p_id,
                    None => return Ok(Vec::new()),
                };
                match inner.property_kind(p_id)? {
                    Some(kind) => (table_of_kind(kind), Some(p_id)),
                    None => return Ok(Vec::new()),
                }
            }
        };
        let values = inner.values(table, id, p_id, property.is_inverse(), options)?;
        trace!(subject = %page, property = %property, table = table.name, found = values.len(), "sqlite fetch");
        Ok(values)
    }
}
