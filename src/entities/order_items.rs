use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub order_id: i64,
    pub course_id: Option<i64>,
    pub event_id: Option<i64>,
    pub book_id: Option<i64>,
    pub organization_id: Option<i64>,
    pub price: i64,
}

/// What a line item points at. Checked in the same order the checkout flow
/// fills the columns: course, event, book, organization membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemTarget {
    Course(i64),
    Event(i64),
    Book(i64),
    Membership(i64),
}

impl Model {
    pub fn target(&self) -> Option<ItemTarget> {
        self.course_id
            .map(ItemTarget::Course)
            .or(self.event_id.map(ItemTarget::Event))
            .or(self.book_id.map(ItemTarget::Book))
            .or(self.organization_id.map(ItemTarget::Membership))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
