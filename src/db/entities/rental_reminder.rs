use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per reminder actually dispatched for a contract. Append-only.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rental_reminders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub contract_id: Uuid,
    pub reminder_type: String,
    pub sent_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rental_contract::Entity",
        from = "Column::ContractId",
        to = "super::rental_contract::Column::Id",
        on_delete = "Cascade",
        on_update = "Cascade"
    )]
    RentalContract,
}

impl Related<super::rental_contract::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RentalContract.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
