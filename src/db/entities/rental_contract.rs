use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::ContractStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rental_contracts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub billboard_id: Uuid,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub client_company: Option<String>,
    pub start_date: ChronoDateTimeUtc,
    pub end_date: ChronoDateTimeUtc,
    pub contract_duration_months: i32,
    pub monthly_rate: f64,
    pub total_amount: f64,
    pub contract_pdf: Option<String>,
    pub status: ContractStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::billboard::Entity",
        from = "Column::BillboardId",
        to = "super::billboard::Column::Id",
        on_delete = "Restrict",
        on_update = "Cascade"
    )]
    Billboard,
    #[sea_orm(has_many = "super::rental_reminder::Entity")]
    RentalReminder,
}

impl Related<super::billboard::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Billboard.def()
    }
}

impl Related<super::rental_reminder::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RentalReminder.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
