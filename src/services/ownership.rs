//! Maps a purchased line item to the wallet that earns from it.

use crate::entities::{
    ItemTarget, WalletOwner, book_entity as books, course_entity as courses,
    event_entity as events, order_item_entity as order_items,
    organization_entity as organizations,
};
use crate::error::AppResult;
use sea_orm::{ConnectionTrait, EntityTrait};

/// Catalogue facts the resolver needs, loaded from an order item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchasedItem {
    Course {
        title: String,
        creator_id: i64,
        organization_id: Option<i64>,
    },
    Event {
        title: String,
        organizer_id: Option<i64>,
        /// parent course as `(creator_id, organization_id)`
        course: Option<(i64, Option<i64>)>,
    },
    Book {
        title: String,
        created_by: Option<i64>,
    },
    Membership {
        organization_id: i64,
        name: String,
    },
}

impl PurchasedItem {
    /// Human label used in ledger descriptions.
    pub fn label(&self) -> String {
        match self {
            PurchasedItem::Course { title, .. } => format!("Course: {title}"),
            PurchasedItem::Event { title, .. } => format!("Event: {title}"),
            PurchasedItem::Book { title, .. } => format!("Book: {title}"),
            PurchasedItem::Membership { name, .. } => format!("Membership: {name}"),
        }
    }
}

pub fn resolve_seller_wallet(item: &PurchasedItem) -> Option<WalletOwner> {
    match item {
        PurchasedItem::Course {
            creator_id,
            organization_id,
            ..
        } => Some(match organization_id {
            Some(org_id) => WalletOwner::Organization(*org_id),
            None => WalletOwner::User(*creator_id),
        }),
        PurchasedItem::Event {
            organizer_id,
            course,
            ..
        } => match (course, organizer_id) {
            (Some((_, Some(org_id))), _) => Some(WalletOwner::Organization(*org_id)),
            (_, Some(organizer)) => Some(WalletOwner::User(*organizer)),
            (Some((creator_id, None)), None) => Some(WalletOwner::User(*creator_id)),
            (None, None) => None,
        },
        PurchasedItem::Book { created_by, .. } => created_by.map(WalletOwner::User),
        PurchasedItem::Membership {
            organization_id, ..
        } => Some(WalletOwner::Organization(*organization_id)),
    }
}

/// `None` when the item points at nothing, or at a row that no longer exists.
pub async fn load_purchased_item<C>(
    conn: &C,
    item: &order_items::Model,
) -> AppResult<Option<PurchasedItem>>
where
    C: ConnectionTrait,
{
    let Some(target) = item.target() else {
        return Ok(None);
    };

    let loaded = match target {
        ItemTarget::Course(id) => {
            courses::Entity::find_by_id(id)
                .one(conn)
                .await?
                .map(|c| PurchasedItem::Course {
                    title: c.title,
                    creator_id: c.creator_id,
                    organization_id: c.organization_id,
                })
        }
        ItemTarget::Event(id) => match events::Entity::find_by_id(id).one(conn).await? {
            None => None,
            Some(event) => {
                let course = match event.course_id {
                    Some(course_id) => courses::Entity::find_by_id(course_id)
                        .one(conn)
                        .await?
                        .map(|c| (c.creator_id, c.organization_id)),
                    None => None,
                };
                Some(PurchasedItem::Event {
                    title: event.title,
                    organizer_id: event.organizer_id,
                    course,
                })
            }
        },
        ItemTarget::Book(id) => books::Entity::find_by_id(id)
            .one(conn)
            .await?
            .map(|b| PurchasedItem::Book {
                title: b.title,
                created_by: b.created_by,
            }),
        ItemTarget::Membership(id) => organizations::Entity::find_by_id(id)
            .one(conn)
            .await?
            .map(|o| PurchasedItem::Membership {
                organization_id: o.id,
                name: o.name,
            }),
    };

    Ok(loaded)
}
