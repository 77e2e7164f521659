//! The page reorder endpoint.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::domain::{ModuleContext, PageId, UserId};
use crate::error::{ExportError, Result};
use crate::host::{AccessControl, LessonSource};
use crate::order::{OrderListing, PageOrderStore};
use crate::store::PageOrderRepository;

use super::links::MANAGE_CAPABILITY;

/// A parsed reorder request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderAction {
    List,
    MoveUp { page: PageId },
    MoveDown { page: PageId },
    MoveTo { page: PageId, position: i64 },
}

impl ReorderAction {
    /// Parses the endpoint's `action`, `pageid` and `position` parameters.
    ///
    /// A missing action means `list`.
    pub fn parse(action: Option<&str>, page: Option<PageId>, position: Option<i64>) -> Result<Self> {
        let action = action.unwrap_or("list");
        let missing = |what: &str| ExportError::InvalidAction {
            action: format!("{action} without {what}"),
        };

        match action {
            "list" => Ok(ReorderAction::List),
            "moveup" => Ok(ReorderAction::MoveUp {
                page: page.ok_or_else(|| missing("a page id"))?,
            }),
            "movedown" => Ok(ReorderAction::MoveDown {
                page: page.ok_or_else(|| missing("a page id"))?,
            }),
            "moveto" => Ok(ReorderAction::MoveTo {
                page: page.ok_or_else(|| missing("a page id"))?,
                position: position.ok_or_else(|| missing("a position"))?,
            }),
            other => Err(ExportError::InvalidAction {
                action: other.to_string(),
            }),
        }
    }

    fn page(&self) -> Option<PageId> {
        match self {
            ReorderAction::List => None,
            ReorderAction::MoveUp { page }
            | ReorderAction::MoveDown { page }
            | ReorderAction::MoveTo { page, .. } => Some(*page),
        }
    }
}

/// Reply to a move: `{"error": 0, "order": {"<pageId>": <position>}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReorderResponse {
    pub error: u8,
    pub order: BTreeMap<String, i64>,
}

impl ReorderResponse {
    fn from_order(order: BTreeMap<PageId, i64>) -> Self {
        Self {
            error: 0,
            order: order
                .into_iter()
                .map(|(id, pos)| (id.to_string(), pos))
                .collect(),
        }
    }
}

/// What the endpoint sends back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReorderReply {
    Listing(Vec<OrderListing>),
    Order(ReorderResponse),
}

/// Runs one reorder request for a lesson manager.
///
/// The first page is pinned: moving it, or moving another page to position
/// zero, leaves the order as it is. The reply still carries the full order.
pub fn reorder<H, R>(
    host: &H,
    repo: &mut R,
    module: &ModuleContext,
    user: UserId,
    action: ReorderAction,
) -> Result<ReorderReply>
where
    H: LessonSource + AccessControl + ?Sized,
    R: PageOrderRepository + ?Sized,
{
    if !host.has_capability(MANAGE_CAPABILITY, module.context_id, user)? {
        return Err(ExportError::denied(format!(
            "user {user} lacks {MANAGE_CAPABILITY}"
        )));
    }

    let mut store = PageOrderStore::load(repo, host, module.lesson_id)?;

    let Some(page) = action.page() else {
        return Ok(ReorderReply::Listing(store.listing()));
    };

    let current = store.position_of(page)?;
    let moved = match action {
        _ if current == 0 => false,
        ReorderAction::MoveUp { .. } if current > 1 => store.move_up(page)?,
        ReorderAction::MoveDown { .. } => store.move_down(page)?,
        ReorderAction::MoveTo { position, .. } if position >= 1 => store.move_to(page, position)?,
        _ => false,
    };
    if moved {
        info!(lesson = %module.lesson_id, page = %page, from = current, "reordered page");
    }

    Ok(ReorderReply::Order(ReorderResponse::from_order(store.order_map())))
}
