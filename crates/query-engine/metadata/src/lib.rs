//! Static description of the queryable database.

pub mod metadata;

pub use metadata::{
    ColumnInfo, ForeignRelation, ForeignRelations, Metadata, Nullable, ScalarType, TableInfo,
    TablesInfo,
};
