use std::collections::{BTreeMap, HashMap};

use crate::error::AnalysisError;

/// A resolved team identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamRef<'a> {
    pub id: &'a str,
    pub code: &'a str,
    pub name: &'a str,
}

/// Validated bijection between team ids, display names and short codes.
///
/// The power-rank table keys teams by display name while every other table
/// keys them by id; this directory is the only place the two are related.
#[derive(Debug, Clone)]
pub struct TeamDirectory {
    names: BTreeMap<String, String>,
    codes: BTreeMap<String, String>,
    id_by_code: HashMap<String, String>,
    id_by_name: HashMap<String, String>,
}

impl TeamDirectory {
    /// Builds the directory from `id -> display name` and `id -> code` maps.
    ///
    /// Both maps must cover the same ids, and names and codes must be unique.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::collections::BTreeMap;
    /// # use powerrank_analysis::team::TeamDirectory;
    /// let names = BTreeMap::from([("147".to_owned(), "Yankees".to_owned())]);
    /// let codes = BTreeMap::from([("147".to_owned(), "NYY".to_owned())]);
    /// let directory = TeamDirectory::new(names, codes).unwrap();
    /// assert_eq!(directory.resolve_code("NYY").unwrap().name, "Yankees");
    /// assert!(directory.resolve_code("BOS").is_err());
    /// ```
    pub fn new(
        names: BTreeMap<String, String>,
        codes: BTreeMap<String, String>,
    ) -> Result<Self, AnalysisError> {
        if let Some(id) = names.keys().find(|id| !codes.contains_key(*id)) {
            return Err(AnalysisError::InconsistentMappings {
                reason: format!("team id `{id}` has a name but no code"),
            });
        }
        if let Some(id) = codes.keys().find(|id| !names.contains_key(*id)) {
            return Err(AnalysisError::InconsistentMappings {
                reason: format!("team id `{id}` has a code but no name"),
            });
        }

        let id_by_code = invert(&codes, "code")?;
        let id_by_name = invert(&names, "name")?;

        Ok(Self {
            names,
            codes,
            id_by_code,
            id_by_name,
        })
    }

    /// Resolves a short code to the full identity.
    pub fn resolve_code(&self, code: &str) -> Result<TeamRef<'_>, AnalysisError> {
        let id = self
            .id_by_code
            .get(code)
            .ok_or_else(|| AnalysisError::UnknownTeamCode {
                code: code.to_owned(),
            })?;
        self.resolve_id(id)
    }

    /// Resolves a team id to the full identity.
    pub fn resolve_id(&self, team_id: &str) -> Result<TeamRef<'_>, AnalysisError> {
        let (id, name) =
            self.names
                .get_key_value(team_id)
                .ok_or_else(|| AnalysisError::UnknownTeamId {
                    team_id: team_id.to_owned(),
                })?;
        let code = self
            .codes
            .get(team_id)
            .ok_or_else(|| AnalysisError::UnknownTeamId {
                team_id: team_id.to_owned(),
            })?;
        Ok(TeamRef { id, code, name })
    }

    /// Display name of a team id.
    pub fn display_name(&self, team_id: &str) -> Result<&str, AnalysisError> {
        self.names
            .get(team_id)
            .map(String::as_str)
            .ok_or_else(|| AnalysisError::UnknownTeamId {
                team_id: team_id.to_owned(),
            })
    }

    /// Team id of a display name, if known.
    #[must_use]
    pub fn id_for_name(&self, name: &str) -> Option<&str> {
        self.id_by_name.get(name).map(String::as_str)
    }

    /// All teams ordered by id.
    pub fn teams(&self) -> impl Iterator<Item = TeamRef<'_>> {
        self.names.iter().filter_map(|(id, name)| {
            let code = self.codes.get(id)?;
            Some(TeamRef { id, code, name })
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn invert(
    map: &BTreeMap<String, String>,
    what: &str,
) -> Result<HashMap<String, String>, AnalysisError> {
    let mut inverse = HashMap::with_capacity(map.len());
    for (id, value) in map {
        if let Some(other) = inverse.insert(value.clone(), id.clone()) {
            return Err(AnalysisError::InconsistentMappings {
                reason: format!("{what} `{value}` is shared by team ids `{other}` and `{id}`"),
            });
        }
    }
    Ok(inverse)
}
