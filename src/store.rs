//! Persistence of the report filters between runs
use crate::selector::{DateRange, InvertedRangeError};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use time::{Date, format_description::FormatItem, macros::format_description};

pub(crate) static YMD_FMT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");

const START_KEY: &str = "startDate";
const END_KEY: &str = "endDate";
const GROUP_BY_KEY: &str = "groupBy";
const CATEGORY_KEY: &str = "category";
const ASIN_KEY: &str = "asin";

/// A string key-value store.  Keys are namespaced by the caller.
pub(crate) trait FilterStore: fmt::Debug {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct MemoryStore(BTreeMap<String, String>);

impl MemoryStore {
    pub(crate) fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

impl FilterStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.0.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.0.remove(key);
        Ok(())
    }
}

/// A store kept as a single JSON object on disk.  The whole file is
/// rewritten on every change.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Opens the store at `path`, starting out empty if the file does not
    /// exist yet
    pub(crate) fn open<P: Into<PathBuf>>(path: P) -> Result<JsonFileStore, StoreError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(src) => serde_json::from_str(&src).map_err(|source| StoreError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        Ok(JsonFileStore { path, entries })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let src = serde_json::to_string_pretty(&self.entries).map_err(|source| {
            StoreError::Serialize {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, src + "\n").map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl FilterStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.entries.get(key).map(String::as_str) != Some(value) {
            self.entries.insert(key.to_owned(), value.to_owned());
            self.flush()?;
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("failed to read filter store {}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write filter store {}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("filter store {} is not a JSON object of strings", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to serialize filter store {}", .path.display())]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("stored value {value:?} for {key} is not a YYYY-MM-DD date")]
    BadDate {
        key: String,
        value: String,
        source: time::error::Parse,
    },
    #[error("stored value {value:?} for {key} is not a grouping")]
    BadGroupBy {
        key: String,
        value: String,
        source: UnknownGroupByError,
    },
    #[error("stored date range is inverted")]
    Inverted(#[from] InvertedRangeError),
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub(crate) enum GroupBy {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl GroupBy {
    pub(crate) fn next(self) -> GroupBy {
        match self {
            GroupBy::Daily => GroupBy::Weekly,
            GroupBy::Weekly => GroupBy::Monthly,
            GroupBy::Monthly => GroupBy::Daily,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            GroupBy::Daily => "daily",
            GroupBy::Weekly => "weekly",
            GroupBy::Monthly => "monthly",
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupBy {
    type Err = UnknownGroupByError;

    fn from_str(s: &str) -> Result<GroupBy, UnknownGroupByError> {
        match s {
            "daily" => Ok(GroupBy::Daily),
            "weekly" => Ok(GroupBy::Weekly),
            "monthly" => Ok(GroupBy::Monthly),
            _ => Err(UnknownGroupByError),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("expected one of \"daily\", \"weekly\", or \"monthly\"")]
pub(crate) struct UnknownGroupByError;

/// Everything a report request is filtered by
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Filters {
    pub(crate) range: DateRange,
    pub(crate) group_by: GroupBy,
    /// Product category to restrict the report to; empty for all
    pub(crate) category: String,
    /// Single product (ASIN) to restrict the report to; empty for all
    pub(crate) asin: String,
}

impl Filters {
    pub(crate) fn default_for(today: Date) -> Filters {
        Filters {
            range: DateRange::default_for(today),
            group_by: GroupBy::default(),
            category: String::new(),
            asin: String::new(),
        }
    }

    /// Reads the filters saved for `module`.  Missing keys take their
    /// defaults; values that are present but malformed are errors.
    pub(crate) fn load<S: FilterStore + ?Sized>(
        store: &S,
        module: &str,
        today: Date,
    ) -> Result<Filters, StoreError> {
        let defaults = Filters::default_for(today);
        let start = load_date(store, &key(module, START_KEY))?;
        let end = load_date(store, &key(module, END_KEY))?;
        let range = match (start, end) {
            (Some(start), Some(end)) => DateRange::new(start, end)?,
            // A start saved without an end was a selection still in progress
            (Some(start), None) => DateRange::starting(start),
            // The default span, ending on the saved day
            (None, Some(end)) => DateRange::default_for(end),
            (None, None) => defaults.range,
        };
        let group_by_key = key(module, GROUP_BY_KEY);
        let group_by = match store.get(&group_by_key) {
            Some(value) => value
                .parse::<GroupBy>()
                .map_err(|source| StoreError::BadGroupBy {
                    key: group_by_key,
                    value,
                    source,
                })?,
            None => defaults.group_by,
        };
        Ok(Filters {
            range,
            group_by,
            category: store.get(&key(module, CATEGORY_KEY)).unwrap_or_default(),
            asin: store.get(&key(module, ASIN_KEY)).unwrap_or_default(),
        })
    }

    pub(crate) fn save<S: FilterStore + ?Sized>(
        &self,
        store: &mut S,
        module: &str,
    ) -> Result<(), StoreError> {
        for (name, date) in [
            (START_KEY, self.range.start()),
            (END_KEY, self.range.end()),
        ] {
            let k = key(module, name);
            match date {
                Some(d) => store.set(&k, &d.to_string())?,
                None => store.remove(&k)?,
            }
        }
        for (name, text) in [(CATEGORY_KEY, &self.category), (ASIN_KEY, &self.asin)] {
            let k = key(module, name);
            if text.is_empty() {
                store.remove(&k)?;
            } else {
                store.set(&k, text)?;
            }
        }
        store.set(&key(module, GROUP_BY_KEY), self.group_by.as_str())
    }

    /// Forgets everything saved for `module`
    pub(crate) fn clear<S: FilterStore + ?Sized>(
        store: &mut S,
        module: &str,
    ) -> Result<(), StoreError> {
        for name in [START_KEY, END_KEY, GROUP_BY_KEY, CATEGORY_KEY, ASIN_KEY] {
            store.remove(&key(module, name))?;
        }
        Ok(())
    }
}

fn key(module: &str, name: &str) -> String {
    format!("{module}_{name}")
}

fn load_date<S: FilterStore + ?Sized>(store: &S, key: &str) -> Result<Option<Date>, StoreError> {
    store
        .get(key)
        .map(|value| {
            Date::parse(&value, &YMD_FMT).map_err(|source| StoreError::BadDate {
                key: key.to_owned(),
                value,
                source,
            })
        })
        .transpose()
}
