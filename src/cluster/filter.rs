//! Node filters - selecting nodes by role and index
//!
//! Repeated `--volume` and `--port` flags carry an optional node filter after an
//! `@`, e.g. `-v /tmp:/data@worker[0,1]` or `-p 8080:80@loadbalancer`.
//!
//! # Grammar
//!
//! ```text
//! FILTER := GROUP [ '[' SUBSET ']' ]
//! GROUP  := master | worker | loadbalancer | all
//! SUBSET := '*' | INDEX (',' INDEX)* | [INDEX] ':' [INDEX]
//! ```
//!
//! Indexes count within the role (`worker[0]` is the first worker), ranges are
//! inclusive, and a bare group selects every node of that role.

use std::collections::BTreeSet;

use regex::Regex;
use thiserror::Error;
use tracing::warn;

use super::types::{Node, Role};

/// Errors from splitting or resolving node filters
#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("Invalid flag '{0}': only one '@' for node filter allowed")]
    MultipleSeparators(String),

    #[error("Invalid flag '{0}' includes '@' but is missing either an object or a filter")]
    MissingPart(String),

    #[error("Failed to parse node filter '{0}': expected ROLE[SUBSET] with ROLE one of master, worker, loadbalancer, all")]
    Syntax(String),

    #[error("Failed to parse node filter '{filter}': unknown subset '{subset}'")]
    UnknownSubset { filter: String, subset: String },

    #[error("Index out of range: index '{index}' >= number of available nodes ({available}) in filter '{filter}'")]
    IndexOutOfRange {
        filter: String,
        index: usize,
        available: usize,
    },

    #[error("Invalid range in node filter '{0}': end is lower than start")]
    InvalidRange(String),

    #[error("Node filter '{0}' does not match any node")]
    NoMatch(String),
}

// ============================================================================
// Flag splitting
// ============================================================================

/// Split `OBJECT[@FILTER[;FILTER...]]` into the object and its filter terms
pub fn split_filters_from_flag(flag: &str) -> Result<(String, Vec<String>), FilterError> {
    let Some((object, filters)) = flag.split_once('@') else {
        return Ok((flag.to_string(), Vec::new()));
    };

    if filters.contains('@') {
        return Err(FilterError::MultipleSeparators(flag.to_string()));
    }

    if object.is_empty() || filters.split(';').any(str::is_empty) {
        return Err(FilterError::MissingPart(flag.to_string()));
    }

    Ok((
        object.to_string(),
        filters.split(';').map(String::from).collect(),
    ))
}

// ============================================================================
// Filter parsing
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Group {
    All,
    Role(Role),
}

#[derive(Debug, Clone, PartialEq)]
enum Subset {
    Whole,
    List(Vec<usize>),
    Range(Option<usize>, Option<usize>),
}

#[derive(Debug, Clone, PartialEq)]
struct ParsedFilter {
    group: Group,
    subset: Subset,
}

fn parse_group(s: &str) -> Option<Group> {
    match s {
        "all" => Some(Group::All),
        "master" => Some(Group::Role(Role::Master)),
        "worker" => Some(Group::Role(Role::Worker)),
        "loadbalancer" => Some(Group::Role(Role::LoadBalancer)),
        _ => None,
    }
}

fn parse_subset(filter: &str, subset: &str) -> Result<Subset, FilterError> {
    let unknown = || FilterError::UnknownSubset {
        filter: filter.to_string(),
        subset: subset.to_string(),
    };

    if subset == "*" {
        return Ok(Subset::Whole);
    }

    if let Some((start, end)) = subset.split_once(':') {
        let bound = |s: &str| -> Result<Option<usize>, FilterError> {
            if s.is_empty() {
                Ok(None)
            } else {
                s.parse().map(Some).map_err(|_| unknown())
            }
        };
        return Ok(Subset::Range(bound(start)?, bound(end)?));
    }

    subset
        .split(',')
        .map(|i| i.parse::<usize>().map_err(|_| unknown()))
        .collect::<Result<Vec<_>, _>>()
        .map(Subset::List)
}

fn parse_filter(filter: &str) -> Result<ParsedFilter, FilterError> {
    let syntax = || FilterError::Syntax(filter.to_string());

    let pattern = Regex::new(r"^(?P<group>[a-z]+)(?:\[(?P<subset>[^\]]*)\])?$").map_err(|_| syntax())?;
    let caps = pattern.captures(filter).ok_or_else(syntax)?;

    let group = caps
        .name("group")
        .and_then(|g| parse_group(g.as_str()))
        .ok_or_else(syntax)?;

    let subset = match caps.name("subset") {
        Some(s) => parse_subset(filter, s.as_str())?,
        None => Subset::Whole,
    };

    if group == Group::All && subset != Subset::Whole {
        return Err(FilterError::UnknownSubset {
            filter: filter.to_string(),
            subset: caps
                .name("subset")
                .map(|s| s.as_str().to_string())
                .unwrap_or_default(),
        });
    }

    Ok(ParsedFilter { group, subset })
}

// ============================================================================
// Resolution
// ============================================================================

/// Selects nodes out of a candidate list
///
/// Returns indexes into `candidates`, in candidate order, without duplicates.
pub trait NodeFilterResolver {
    fn resolve(&self, candidates: &[&Node], filters: &[String]) -> Result<Vec<usize>, FilterError>;
}

/// Resolver for the role/index grammar described in the module docs
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleFilter;

impl NodeFilterResolver for RoleFilter {
    fn resolve(&self, candidates: &[&Node], filters: &[String]) -> Result<Vec<usize>, FilterError> {
        if filters.is_empty() {
            warn!("No node filter specified, selecting all {} candidates", candidates.len());
            return Ok((0..candidates.len()).collect());
        }

        let mut selected = BTreeSet::new();

        for raw in filters {
            let filter = parse_filter(raw)?;

            let role = match filter.group {
                Group::All => {
                    if filters.len() > 1 {
                        warn!("Node filter 'all' set, ignoring the others in {:?}", filters);
                    }
                    if candidates.is_empty() {
                        return Err(FilterError::NoMatch(raw.clone()));
                    }
                    return Ok((0..candidates.len()).collect());
                }
                Group::Role(role) => role,
            };

            let group: Vec<usize> = candidates
                .iter()
                .enumerate()
                .filter(|(_, node)| node.role() == role)
                .map(|(i, _)| i)
                .collect();

            let out_of_range = |index: usize| FilterError::IndexOutOfRange {
                filter: raw.clone(),
                index,
                available: group.len(),
            };

            match filter.subset {
                Subset::Whole => selected.extend(group.iter().copied()),
                Subset::List(indexes) => {
                    for index in indexes {
                        let candidate = group.get(index).ok_or_else(|| out_of_range(index))?;
                        selected.insert(*candidate);
                    }
                }
                Subset::Range(start, end) => {
                    let start = start.unwrap_or(0);
                    let end = match end.or_else(|| group.len().checked_sub(1)) {
                        Some(end) => end,
                        None if start == 0 => continue,
                        None => return Err(out_of_range(start)),
                    };
                    if end < start {
                        return Err(FilterError::InvalidRange(raw.clone()));
                    }
                    if end >= group.len() {
                        return Err(out_of_range(end));
                    }
                    selected.extend(group[start..=end].iter().copied());
                }
            }
        }

        if selected.is_empty() {
            return Err(FilterError::NoMatch(filters.join(";")));
        }

        Ok(selected.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology(masters: usize, workers: usize, lb: bool) -> Vec<Node> {
        let mut nodes: Vec<Node> = (0..masters).map(|_| Node::master("img", vec![])).collect();
        nodes.extend((0..workers).map(|_| Node::worker("img", vec![])));
        if lb {
            nodes.push(Node::load_balancer());
        }
        nodes
    }

    fn resolve(nodes: &[Node], filters: &[&str]) -> Result<Vec<usize>, FilterError> {
        let candidates: Vec<&Node> = nodes.iter().collect();
        let filters: Vec<String> = filters.iter().map(|f| f.to_string()).collect();
        RoleFilter.resolve(&candidates, &filters)
    }

    #[test]
    fn test_split_without_filter() {
        let (object, filters) = split_filters_from_flag("/tmp:/data").unwrap();
        assert_eq!(object, "/tmp:/data");
        assert!(filters.is_empty());
    }

    #[test]
    fn test_split_with_filters() {
        let (object, filters) = split_filters_from_flag("/tmp:/data@worker[0];master[1]").unwrap();
        assert_eq!(object, "/tmp:/data");
        assert_eq!(filters, vec!["worker[0]", "master[1]"]);
    }

    #[test]
    fn test_split_errors() {
        assert!(matches!(
            split_filters_from_flag("a@b@c"),
            Err(FilterError::MultipleSeparators(_))
        ));
        assert!(matches!(
            split_filters_from_flag("@worker[0]"),
            Err(FilterError::MissingPart(_))
        ));
        assert!(matches!(
            split_filters_from_flag("8080:80@"),
            Err(FilterError::MissingPart(_))
        ));
        assert!(matches!(
            split_filters_from_flag("8080:80@worker[0];"),
            Err(FilterError::MissingPart(_))
        ));
    }

    #[test]
    fn test_parse_filter_forms() {
        assert_eq!(
            parse_filter("worker").unwrap(),
            ParsedFilter {
                group: Group::Role(Role::Worker),
                subset: Subset::Whole
            }
        );
        assert_eq!(parse_filter("master[0,2]").unwrap().subset, Subset::List(vec![0, 2]));
        assert_eq!(parse_filter("worker[1:]").unwrap().subset, Subset::Range(Some(1), None));
        assert_eq!(parse_filter("worker[*]").unwrap().subset, Subset::Whole);
        assert_eq!(parse_filter("all").unwrap().group, Group::All);
    }

    #[test]
    fn test_parse_filter_errors() {
        assert!(matches!(parse_filter("agent[0]"), Err(FilterError::Syntax(_))));
        assert!(matches!(parse_filter("worker[0"), Err(FilterError::Syntax(_))));
        assert!(matches!(parse_filter(""), Err(FilterError::Syntax(_))));
        assert!(matches!(
            parse_filter("worker[a]"),
            Err(FilterError::UnknownSubset { .. })
        ));
        assert!(matches!(
            parse_filter("worker[]"),
            Err(FilterError::UnknownSubset { .. })
        ));
        assert!(matches!(
            parse_filter("all[0]"),
            Err(FilterError::UnknownSubset { .. })
        ));
    }

    #[test]
    fn test_resolve_no_filter_selects_everything() {
        let nodes = topology(1, 2, false);
        assert_eq!(resolve(&nodes, &[]).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_resolve_index_is_per_role() {
        let nodes = topology(3, 2, false);
        assert_eq!(resolve(&nodes, &["worker[0]"]).unwrap(), vec![3]);
        assert_eq!(resolve(&nodes, &["worker[0,1]"]).unwrap(), vec![3, 4]);
        assert_eq!(resolve(&nodes, &["master[2]"]).unwrap(), vec![2]);
    }

    #[test]
    fn test_resolve_union_is_deduplicated_and_ordered() {
        let nodes = topology(2, 2, false);
        let selected = resolve(&nodes, &["worker[1]", "master", "worker[1,0]"]).unwrap();
        assert_eq!(selected, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_resolve_ranges() {
        let nodes = topology(1, 4, false);
        assert_eq!(resolve(&nodes, &["worker[1:2]"]).unwrap(), vec![2, 3]);
        assert_eq!(resolve(&nodes, &["worker[:1]"]).unwrap(), vec![1, 2]);
        assert_eq!(resolve(&nodes, &["worker[2:]"]).unwrap(), vec![3, 4]);
        assert_eq!(resolve(&nodes, &["worker[:]"]).unwrap(), vec![1, 2, 3, 4]);
        assert!(matches!(
            resolve(&nodes, &["worker[2:1]"]),
            Err(FilterError::InvalidRange(_))
        ));
        assert!(matches!(
            resolve(&nodes, &["worker[1:4]"]),
            Err(FilterError::IndexOutOfRange { index: 4, .. })
        ));
    }

    #[test]
    fn test_resolve_all_short_circuits() {
        let nodes = topology(1, 1, true);
        assert_eq!(resolve(&nodes, &["worker[0]", "all"]).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_resolve_loadbalancer() {
        let nodes = topology(1, 1, true);
        assert_eq!(resolve(&nodes, &["loadbalancer"]).unwrap(), vec![2]);

        let nodes = topology(1, 1, false);
        assert!(matches!(
            resolve(&nodes, &["loadbalancer"]),
            Err(FilterError::NoMatch(_))
        ));
    }

    #[test]
    fn test_resolve_out_of_range() {
        let nodes = topology(1, 2, false);
        let err = resolve(&nodes, &["worker[2]"]).unwrap_err();
        assert_eq!(
            err,
            FilterError::IndexOutOfRange {
                filter: "worker[2]".to_string(),
                index: 2,
                available: 2
            }
        );
    }

    #[test]
    fn test_resolve_zero_matches_fails() {
        let nodes = topology(1, 0, false);
        assert!(matches!(
            resolve(&nodes, &["worker"]),
            Err(FilterError::NoMatch(_))
        ));
        assert!(matches!(resolve(&[], &["all"]), Err(FilterError::NoMatch(_))));
    }
}
