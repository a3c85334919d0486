use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{ItemGroup, Side, SourceFile};

/// Substring substitution applied to a lower-cased file name before the key is parsed.
/// Used to paper over known misspellings such as `thsirt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rename {
    pub from: String,
    pub to: String,
}

impl FromStr for Rename {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once('=')
            .ok_or_else(|| format!("rename '{}' must look like from=to", s))?;
        let from = from.trim().to_lowercase();
        if from.is_empty() {
            return Err(format!("rename '{}' has an empty left-hand side", s));
        }
        Ok(Self {
            from,
            to: to.trim().to_lowercase(),
        })
    }
}

impl TryFrom<String> for Rename {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rename> for String {
    fn from(rename: Rename) -> Self {
        rename.to_string()
    }
}

impl fmt::Display for Rename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.from, self.to)
    }
}

/// Item key and side parsed out of a loosely named file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub key: String,
    pub side: Side,
}

/// Parse `file_name` into an item key and a side.
///
/// The key is the first whitespace- or underscore-separated token of the
/// lower-cased, normalized name (`"1st Hoodie front.png"` gives `1st`). Names
/// with fewer than two tokens yield `None`. The side is `Front` if the name
/// contains `front`, otherwise `Back` if it contains `back`.
pub fn classify(file_name: &str, renames: &[Rename]) -> Option<Classification> {
    let lower = file_name.to_lowercase();

    let normalized = renames
        .iter()
        .fold(lower.clone(), |name, r| name.replace(&r.from, &r.to));

    let mut tokens = normalized
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|t| !t.is_empty());
    let key = tokens.next()?;
    tokens.next()?;

    let side = if lower.contains("front") {
        Side::Front
    } else if lower.contains("back") {
        Side::Back
    } else {
        Side::Unrecognized
    };

    Some(Classification {
        key: key.to_string(),
        side,
    })
}

/// Numeric value of the digits embedded in `key`; `"10th"` is 10, `"first"` is 0
pub fn ordinal(key: &str) -> u64 {
    let digits: String = key.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        0
    } else {
        digits.parse().unwrap_or(u64::MAX)
    }
}

/// Group a flat listing by the key parsed from each file name.
///
/// Groups come back in ascending [`ordinal`] order; ties keep listing order.
/// Files whose side is unrecognized still open a group but fill no slot.
pub fn group_by_token(files: &[SourceFile], renames: &[Rename]) -> Vec<ItemGroup> {
    let mut groups: Vec<ItemGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for file in files {
        let Some(Classification { key, side }) = classify(&file.name, renames) else {
            continue;
        };

        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(ItemGroup::new(key));
            groups.len() - 1
        });
        groups[slot].assign(side, file.clone());
    }

    groups.sort_by_key(|g| ordinal(&g.key));
    groups
}

/// Build one group per folder. The first listed image is the front, the
/// second the back; anything after that is ignored. Folders without images
/// produce no group.
///
/// Positions count only files the lister kept, so `model` preview shots are
/// skipped here as in the flat layout.
pub fn group_by_folder(folders: Vec<(String, Vec<SourceFile>)>) -> Vec<ItemGroup> {
    folders
        .into_iter()
        .filter_map(|(name, files)| {
            let mut files = files.into_iter();
            let front = files.next()?;
            let mut group = ItemGroup::new(name);
            group.assign(Side::Front, front);
            if let Some(back) = files.next() {
                group.assign(Side::Back, back);
            }
            Some(group)
        })
        .collect()
}
