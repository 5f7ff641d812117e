// used for persistence of numbers
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

// used for the time data item
use chrono::NaiveDateTime;
// used for decimal numbers
use bigdecimal::num_bigint::Sign;
use bigdecimal::BigDecimal;
// used when records are stored as JSON
use serde::{Deserialize, Serialize};

use lazy_static::lazy_static;
use regex::Regex;

// used when parsing a string to a BigDecimal
use std::str::FromStr;
// used to print out readable forms of a data item
use std::fmt;
// data items are hashed by content, not by identity
use std::hash::{Hash, Hasher};
use std::ops;

// ------------- Namespaces -------------
pub type Namespace = i32;

pub const NS_MAIN: Namespace = 0;
pub const NS_CATEGORY: Namespace = 14;
pub const NS_PROPERTY: Namespace = 102;

// serialization of times, lexically ordered for four digit years
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

// keeps biased decimal exponents positive, printed 21 digits wide
const EXPONENT_BIAS: i128 = 100_000_000_000_000_000_000;

lazy_static! {
    static ref SEPARATORS: Regex = Regex::new(r"[\s_]+").unwrap();
}

/// Turns a human readable title into its storage form: surrounding
/// whitespace removed, runs of whitespace and underscores collapsed into a
/// single underscore and the first letter upper-cased.
pub fn normalize_db_key(text: &str) -> String {
    let collapsed = SEPARATORS.replace_all(text.trim(), "_");
    let trimmed = collapsed.trim_matches('_');
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ------------- Kinds --------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataItemKind {
    WikiPage,
    Blob,
    Number,
    Boolean,
    Time,
    Record,
}

impl DataItemKind {
    pub const ALL: [DataItemKind; 6] = [
        DataItemKind::WikiPage,
        DataItemKind::Blob,
        DataItemKind::Number,
        DataItemKind::Boolean,
        DataItemKind::Time,
        DataItemKind::Record,
    ];
    pub fn uid(self) -> u8 {
        match self {
            DataItemKind::WikiPage => 1,
            DataItemKind::Blob => 2,
            DataItemKind::Number => 3,
            DataItemKind::Boolean => 4,
            DataItemKind::Time => 5,
            DataItemKind::Record => 6,
        }
    }
    pub fn from_uid(uid: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.uid() == uid)
    }
    pub fn name(self) -> &'static str {
        match self {
            DataItemKind::WikiPage => "WikiPage",
            DataItemKind::Blob => "Blob",
            DataItemKind::Number => "Number",
            DataItemKind::Boolean => "Boolean",
            DataItemKind::Time => "Time",
            DataItemKind::Record => "Record",
        }
    }
}
impl fmt::Display for DataItemKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ------------- Decimal --------------
#[derive(Eq, PartialEq, Hash, PartialOrd, Ord, Clone, Debug, Serialize, Deserialize)]
pub struct Decimal(BigDecimal);

impl Decimal {
    pub fn from_str(s: &str) -> Option<Decimal> {
        match BigDecimal::from_str(s.trim()) {
            Ok(decimal) => Some(Decimal(decimal)),
            _ => None,
        }
    }
    // the canonical text form, so that 1.50 and 1.5 serialize alike
    pub fn canonical(&self) -> String {
        self.0.normalized().to_string()
    }
    /// A text key whose byte order is the numeric order, for stores that
    /// sort text. It holds a sign class, the decimal exponent at a fixed
    /// width and then the significant digits. Negative numbers complement
    /// exponent and digits and close the digits with `~`, which sorts after
    /// every digit.
    pub fn ordered_key(&self) -> String {
        let (int, scale) = self.0.normalized().as_bigint_and_exponent();
        let digits = int.magnitude().to_string();
        // the value is 0.<digits> times ten to this power
        let exponent = digits.len() as i128 - i128::from(scale);
        match int.sign() {
            Sign::NoSign => String::from("1"),
            Sign::Plus => format!("2{:021}{}", EXPONENT_BIAS + exponent, digits),
            Sign::Minus => {
                let complement: String = digits
                    .bytes()
                    .map(|d| char::from(b'9' + b'0' - d))
                    .collect();
                format!("0{:021}{}~", EXPONENT_BIAS - exponent, complement)
            }
        }
    }
}
impl From<i64> for Decimal {
    fn from(n: i64) -> Self {
        Decimal(BigDecimal::from(n))
    }
}
impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl FromSql for Decimal {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        BigDecimal::from_str(text)
            .map(Decimal)
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}
impl ToSql for Decimal {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.canonical()))
    }
}
impl ops::Deref for Decimal {
    type Target = BigDecimal;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// ------------- WikiPage -------------
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WikiPage {
    db_key: String,
    namespace: Namespace,
    interwiki: String,
    subobject: String,
}

impl WikiPage {
    pub fn new(title: &str, namespace: Namespace) -> Self {
        Self {
            db_key: normalize_db_key(title),
            namespace,
            interwiki: String::new(),
            subobject: String::new(),
        }
    }
    pub fn category(title: &str) -> Self {
        Self::new(title, NS_CATEGORY)
    }
    // Restores a page from already normalized parts (as kept by a store).
    pub fn from_parts(db_key: String, namespace: Namespace, interwiki: String, subobject: String) -> Self {
        Self {
            db_key,
            namespace,
            interwiki,
            subobject,
        }
    }
    pub fn with_subobject(mut self, subobject: &str) -> Self {
        self.subobject = subobject.trim().to_string();
        self
    }
    pub fn db_key(&self) -> &str {
        &self.db_key
    }
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }
    pub fn interwiki(&self) -> &str {
        &self.interwiki
    }
    pub fn subobject(&self) -> &str {
        &self.subobject
    }
    pub fn title(&self) -> String {
        self.db_key.replace('_', " ")
    }
    pub fn sort_key(&self) -> String {
        self.title()
    }
    pub fn serialization(&self) -> String {
        format!(
            "{}#{}#{}#{}",
            self.db_key, self.namespace, self.interwiki, self.subobject
        )
    }
}
impl fmt::Display for WikiPage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.namespace == NS_CATEGORY {
            write!(f, "Category:")?;
        }
        write!(f, "{}", self.title())?;
        if !self.subobject.is_empty() {
            write!(f, "#{}", self.subobject)?;
        }
        Ok(())
    }
}

// ------------- Record -------------
// An ordered list of components, any of which may be missing.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Record {
    components: Vec<Option<DataItem>>,
}

impl Record {
    pub fn new(components: Vec<Option<DataItem>>) -> Self {
        Self { components }
    }
    pub fn components(&self) -> &[Option<DataItem>] {
        &self.components
    }
    pub fn len(&self) -> usize {
        self.components.len()
    }
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
    // zero based, use RecordValue for user facing positions
    pub fn component(&self, position: usize) -> Option<&DataItem> {
        self.components.get(position).and_then(Option::as_ref)
    }
}
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parts: Vec<String> = self
            .components
            .iter()
            .map(|c| c.as_ref().map(|i| i.to_string()).unwrap_or_default())
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

// ------------- ItemHash -------------
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemHash([u8; 32]);

impl ItemHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}
impl fmt::Display for ItemHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}
impl fmt::Debug for ItemHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ItemHash({})", self)
    }
}

// ------------- SortKey -------------
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Text(String),
    Number(BigDecimal),
    Boolean(bool),
    Time(NaiveDateTime),
}

// ------------- DataItem -------------
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum DataItem {
    WikiPage(WikiPage),
    Blob(String),
    Number(Decimal),
    Boolean(bool),
    Time(NaiveDateTime),
    Record(Record),
}

impl DataItem {
    pub fn page(title: &str) -> Self {
        DataItem::WikiPage(WikiPage::new(title, NS_MAIN))
    }
    pub fn category(title: &str) -> Self {
        DataItem::WikiPage(WikiPage::category(title))
    }
    pub fn blob<S: Into<String>>(text: S) -> Self {
        DataItem::Blob(text.into())
    }
    pub fn number(number: i64) -> Self {
        DataItem::Number(Decimal::from(number))
    }
    pub fn boolean(value: bool) -> Self {
        DataItem::Boolean(value)
    }
    pub fn time(time: NaiveDateTime) -> Self {
        DataItem::Time(time)
    }
    pub fn record(components: Vec<Option<DataItem>>) -> Self {
        DataItem::Record(Record::new(components))
    }
    pub fn kind(&self) -> DataItemKind {
        match self {
            DataItem::WikiPage(_) => DataItemKind::WikiPage,
            DataItem::Blob(_) => DataItemKind::Blob,
            DataItem::Number(_) => DataItemKind::Number,
            DataItem::Boolean(_) => DataItemKind::Boolean,
            DataItem::Time(_) => DataItemKind::Time,
            DataItem::Record(_) => DataItemKind::Record,
        }
    }
    pub fn as_page(&self) -> Option<&WikiPage> {
        match self {
            DataItem::WikiPage(page) => Some(page),
            _ => None,
        }
    }
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            DataItem::Record(record) => Some(record),
            _ => None,
        }
    }
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            DataItem::Boolean(value) => Some(*value),
            _ => None,
        }
    }
    /// The storage key, only pages have one.
    pub fn db_key(&self) -> Option<&str> {
        self.as_page().map(WikiPage::db_key)
    }
    pub fn serialization(&self) -> String {
        match self {
            DataItem::WikiPage(page) => page.serialization(),
            DataItem::Blob(text) => text.clone(),
            DataItem::Number(number) => number.canonical(),
            DataItem::Boolean(value) => String::from(if *value { "t" } else { "f" }),
            DataItem::Time(time) => time.format(TIME_FORMAT).to_string(),
            DataItem::Record(record) => record
                .components()
                .iter()
                .map(|c| c.as_ref().map(|i| i.item_hash().to_string()).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
    /// Stable content hash; two items are equal exactly when their hashes are.
    pub fn item_hash(&self) -> ItemHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&[self.kind().uid()]);
        match self {
            // titles and subobjects may contain '#', so every part is length prefixed
            DataItem::WikiPage(page) => {
                let namespace = page.namespace().to_le_bytes();
                for part in [
                    page.db_key().as_bytes(),
                    &namespace[..],
                    page.interwiki().as_bytes(),
                    page.subobject().as_bytes(),
                ] {
                    hasher.update(&(part.len() as u64).to_le_bytes());
                    hasher.update(part);
                }
            }
            _ => {
                hasher.update(self.serialization().as_bytes());
            }
        }
        ItemHash(*hasher.finalize().as_bytes())
    }
    pub fn sort_key(&self) -> SortKey {
        match self {
            DataItem::WikiPage(page) => SortKey::Text(page.sort_key()),
            DataItem::Blob(text) => SortKey::Text(text.clone()),
            DataItem::Number(number) => SortKey::Number(number.0.clone()),
            DataItem::Boolean(value) => SortKey::Boolean(*value),
            DataItem::Time(time) => SortKey::Time(*time),
            DataItem::Record(record) => SortKey::Text(record.to_string()),
        }
    }
}
impl From<WikiPage> for DataItem {
    fn from(page: WikiPage) -> Self {
        DataItem::WikiPage(page)
    }
}
impl PartialEq for DataItem {
    fn eq(&self, other: &Self) -> bool {
        self.item_hash() == other.item_hash()
    }
}
impl Eq for DataItem {}
impl Hash for DataItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.item_hash().hash(state);
    }
}
impl fmt::Display for DataItem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DataItem::WikiPage(page) => write!(f, "{}", page),
            DataItem::Blob(text) => write!(f, "{}", text),
            DataItem::Number(number) => write!(f, "{}", number),
            DataItem::Boolean(value) => write!(f, "{}", value),
            DataItem::Time(time) => write!(f, "{}", time.format("%Y-%m-%d %H:%M:%S")),
            DataItem::Record(record) => write!(f, "{}", record),
        }
    }
}
