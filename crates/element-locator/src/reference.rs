//! Stable string references for re-finding elements.
//!
//! Three tiers, tried in order of stability: the accessibility identifier,
//! the structural position (role + sibling index + parent role), and a
//! grid-snapped screen position. The serialized form is a single string
//! prefixed with `@`.

use std::fmt;
use std::str::FromStr;

use axdriver_core_types::{DriverError, Element, ElementQuery};

use crate::matcher::normalize_role;

/// Lattice pitch for positional references.
const GRID_PX: f64 = 50.0;

/// How many candidates the engine examines for a structural reference.
const STRUCTURAL_LIMIT: usize = 10;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ElementReference {
    /// `@id:<identifier>`
    Id(String),
    /// `@ref:<role>-<siblingIndex>-<parentRole>` with `AX` prefixes stripped.
    Structural {
        role: String,
        sibling_index: usize,
        parent_role: String,
    },
    /// `@pos:<role>-<gridX>-<gridY>` on a 50 px lattice.
    Grid {
        role: String,
        grid_x: i64,
        grid_y: i64,
    },
}

fn strip_prefix(role: &str) -> &str {
    role.strip_prefix("AX").unwrap_or(role)
}

fn snap(value: f64) -> i64 {
    (value / GRID_PX).round() as i64
}

impl ElementReference {
    /// Encode an element by the first applicable tier.
    pub fn for_element(element: &Element) -> ElementReference {
        if let Some(identifier) = element.identifier.as_deref().filter(|id| !id.is_empty()) {
            return ElementReference::Id(identifier.to_string());
        }
        if let (Some(index), Some(parent)) = (element.sibling_index, &element.parent_role) {
            return ElementReference::Structural {
                role: strip_prefix(&element.role).to_string(),
                sibling_index: index,
                parent_role: strip_prefix(parent).to_string(),
            };
        }
        ElementReference::Grid {
            role: strip_prefix(&element.role).to_string(),
            grid_x: snap(element.position.x),
            grid_y: snap(element.position.y),
        }
    }

    /// The query that re-finds the referenced element.
    pub fn to_query(&self) -> ElementQuery {
        match self {
            ElementReference::Id(identifier) => ElementQuery::new()
                .with_identifier(identifier.clone())
                .with_limit(1),
            ElementReference::Structural {
                role,
                sibling_index,
                parent_role,
            } => ElementQuery::new()
                .with_role(normalize_role(role))
                .with_sibling_index(*sibling_index)
                .with_parent_role(normalize_role(parent_role))
                .with_limit(STRUCTURAL_LIMIT),
            ElementReference::Grid { role, .. } => {
                ElementQuery::new().with_role(normalize_role(role))
            }
        }
    }

    /// Grid center in screen pixels for proximity filtering of `pos` refs.
    pub fn grid_point(&self) -> Option<(f64, f64)> {
        match self {
            ElementReference::Grid { grid_x, grid_y, .. } => {
                Some((*grid_x as f64 * GRID_PX, *grid_y as f64 * GRID_PX))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ElementReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementReference::Id(identifier) => write!(f, "@id:{}", identifier),
            ElementReference::Structural {
                role,
                sibling_index,
                parent_role,
            } => write!(f, "@ref:{}-{}-{}", role, sibling_index, parent_role),
            ElementReference::Grid {
                role,
                grid_x,
                grid_y,
            } => write!(f, "@pos:{}-{}-{}", role, grid_x, grid_y),
        }
    }
}

impl FromStr for ElementReference {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DriverError::ElementNotFound(format!("unparseable reference '{}'", s));
        let body = s.strip_prefix('@').ok_or_else(invalid)?;

        if let Some(identifier) = body.strip_prefix("id:") {
            if identifier.is_empty() {
                return Err(invalid());
            }
            return Ok(ElementReference::Id(identifier.to_string()));
        }

        if let Some(rest) = body.strip_prefix("ref:") {
            let mut parts = rest.splitn(3, '-');
            let role = parts.next().filter(|p| !p.is_empty()).ok_or_else(invalid)?;
            let index = parts
                .next()
                .and_then(|p| p.parse::<usize>().ok())
                .ok_or_else(invalid)?;
            let parent = parts.next().filter(|p| !p.is_empty()).ok_or_else(invalid)?;
            return Ok(ElementReference::Structural {
                role: role.to_string(),
                sibling_index: index,
                parent_role: parent.to_string(),
            });
        }

        if let Some(rest) = body.strip_prefix("pos:") {
            let (role, coords) = rest.split_once('-').ok_or_else(invalid)?;
            if role.is_empty() {
                return Err(invalid());
            }
            let (grid_x, grid_y) = split_signed_pair(coords).ok_or_else(invalid)?;
            return Ok(ElementReference::Grid {
                role: role.to_string(),
                grid_x,
                grid_y,
            });
        }

        Err(invalid())
    }
}

/// Split `"<i64>-<i64>"` where either side may carry a leading minus sign.
fn split_signed_pair(s: &str) -> Option<(i64, i64)> {
    for (offset, _) in s.char_indices().filter(|&(i, c)| c == '-' && i > 0) {
        if let (Ok(a), Ok(b)) = (s[..offset].parse::<i64>(), s[offset + 1..].parse::<i64>()) {
            return Some((a, b));
        }
    }
    None
}
