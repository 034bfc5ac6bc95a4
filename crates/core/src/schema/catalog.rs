//! The stock catalog schema: every entity, junction and relation.

use super::{
    ColumnDef, ColumnType, Descriptors, EntityDescriptor, EntityName, OnDelete, RelationDecl,
};

// ---------------------------------------------------------------------------
// Entity names
// ---------------------------------------------------------------------------

pub const USER: EntityName = "User";
pub const EMPLOYEE: EntityName = "Employee";
pub const SERIES: EntityName = "Series";
pub const SUPPLIER: EntityName = "Supplier";
pub const ENVIRONMENT: EntityName = "Environment";
pub const MATERIAL: EntityName = "Material";
pub const DESIGN: EntityName = "Design";
pub const COLOR_NAME: EntityName = "ColorName";
pub const COLOR_SCHEME: EntityName = "ColorScheme";
pub const STOCK: EntityName = "Stock";
pub const STOCK_COLOR: EntityName = "StockColor";

pub const STOCK_MATERIAL: EntityName = "StockMaterial";
pub const STOCK_DESIGN: EntityName = "StockDesign";
pub const STOCK_ENVIRONMENT: EntityName = "StockEnvironment";
pub const STOCK_STOCK_COLOR: EntityName = "StockStockColor";
pub const STOCK_COLOR_COLOR_SCHEME: EntityName = "StockColorColorScheme";

/// Allowed values of the stock `block` and `absorption` grades.
pub const GRADES: &[&str] = &["1", "2", "3", "4", "5"];

/// Maximum length of short names and codes.
pub const SHORT_TEXT_LEN: u16 = 15;

/// Maximum length of a stored image path.
pub const IMAGE_PATH_LEN: u16 = 2048;

// ---------------------------------------------------------------------------
// Column helpers
// ---------------------------------------------------------------------------

fn short_name() -> ColumnDef {
    ColumnDef::new("name", ColumnType::Varchar(SHORT_TEXT_LEN)).not_null()
}

fn enable(default: &'static str) -> ColumnDef {
    ColumnDef::new("enable", ColumnType::Boolean)
        .not_null()
        .default_sql(default)
}

fn comment() -> ColumnDef {
    ColumnDef::new("comment", ColumnType::Text)
}

fn unique_code() -> ColumnDef {
    ColumnDef::new("code", ColumnType::Varchar(SHORT_TEXT_LEN))
        .not_null()
        .unique()
}

/// Stock codes are required but may repeat across rows.
fn stock_code() -> ColumnDef {
    ColumnDef::new("code", ColumnType::Varchar(SHORT_TEXT_LEN)).not_null()
}

/// A simple reference entity: short name, enable flag and comment.
fn reference(table: &'static str) -> EntityDescriptor {
    EntityDescriptor::entity(table)
        .column(short_name())
        .column(enable("true"))
        .column(comment())
}

fn image_columns(descriptor: EntityDescriptor) -> EntityDescriptor {
    ["stock_image", "color_image", "removal_image"]
        .into_iter()
        .zip(["stock_image_name", "color_image_name", "removal_image_name"])
        .fold(descriptor, |d, (path, original)| {
            d.column(ColumnDef::new(path, ColumnType::Varchar(IMAGE_PATH_LEN)).not_null())
                .column(ColumnDef::new(original, ColumnType::Text).not_null())
        })
}

/// A junction belonging to both of its ends, removed with either of them.
fn junction(
    table: &'static str,
    (left, left_key): (EntityName, &'static str),
    (right, right_key): (EntityName, &'static str),
) -> EntityDescriptor {
    EntityDescriptor::junction(table)
        .belongs_to(
            RelationDecl::to(left, left_key)
                .required()
                .on_delete(OnDelete::Cascade),
        )
        .belongs_to(
            RelationDecl::to(right, right_key)
                .required()
                .on_delete(OnDelete::Cascade),
        )
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Build the descriptor map for the whole catalog.
pub fn catalog_schema() -> Descriptors {
    let mut schema = Descriptors::new();

    schema.insert(
        USER,
        EntityDescriptor::entity("user")
            .column(
                ColumnDef::new("user_type", ColumnType::Integer)
                    .not_null()
                    .default_sql("1"),
            )
            .column(
                ColumnDef::new("account", ColumnType::Varchar(255))
                    .not_null()
                    .unique(),
            )
            .column(ColumnDef::new("email", ColumnType::Varchar(255)))
            .column(ColumnDef::new("password", ColumnType::Char(60)).not_null())
            .has_one(RelationDecl::to(EMPLOYEE, "user_id").on_delete(OnDelete::SetNull)),
    );

    schema.insert(
        EMPLOYEE,
        EntityDescriptor::entity("employee")
            .column(enable("false"))
            .column(
                ColumnDef::new("role", ColumnType::Integer)
                    .not_null()
                    .default_sql("1"),
            )
            .column(ColumnDef::new("code", ColumnType::Char(8)).unique())
            .column(ColumnDef::new("avatar", ColumnType::Varchar(255)))
            .column(ColumnDef::new("id_code", ColumnType::Char(10)).not_null())
            .column(ColumnDef::new("phone_number", ColumnType::Char(10)).not_null())
            .column(ColumnDef::new("email", ColumnType::Varchar(255)).not_null())
            .column(ColumnDef::new("password", ColumnType::Char(60)).not_null())
            .belongs_to(RelationDecl::to(USER, "user_id")),
    );

    schema.insert(
        SERIES,
        reference("series")
            .column(unique_code())
            .has_many(RelationDecl::to(STOCK, "series_id").required()),
    );

    schema.insert(
        SUPPLIER,
        reference("supplier")
            .column(unique_code())
            .has_many(RelationDecl::to(STOCK, "supplier_id").on_delete(OnDelete::SetNull)),
    );

    schema.insert(ENVIRONMENT, reference("environment"));
    schema.insert(
        MATERIAL,
        reference("material").belongs_to_many(
            RelationDecl::to(STOCK, "material_id").through(STOCK_MATERIAL, "stock_id"),
        ),
    );
    schema.insert(DESIGN, reference("design"));
    schema.insert(COLOR_NAME, reference("color_name"));
    schema.insert(
        COLOR_SCHEME,
        reference("color_scheme").belongs_to_many(
            RelationDecl::to(STOCK_COLOR, "color_scheme_id")
                .through(STOCK_COLOR_COLOR_SCHEME, "stock_color_id"),
        ),
    );

    schema.insert(
        STOCK,
        EntityDescriptor::entity("stock")
            .column(stock_code())
            .column(short_name())
            .column(enable("true"))
            .column(ColumnDef::new("main_image", ColumnType::Varchar(IMAGE_PATH_LEN)))
            .column(ColumnDef::new("block", ColumnType::Enum(GRADES)))
            .column(ColumnDef::new("absorption", ColumnType::Enum(GRADES)))
            .belongs_to(RelationDecl::to(SERIES, "series_id").required())
            .belongs_to(RelationDecl::to(SUPPLIER, "supplier_id").on_delete(OnDelete::SetNull))
            .has_many(
                RelationDecl::to(STOCK_COLOR, "stock_id")
                    .required()
                    .on_delete(OnDelete::Cascade),
            )
            .belongs_to_many(
                RelationDecl::to(MATERIAL, "stock_id").through(STOCK_MATERIAL, "material_id"),
            )
            .belongs_to_many(
                RelationDecl::to(DESIGN, "stock_id").through(STOCK_DESIGN, "design_id"),
            )
            .belongs_to_many(
                RelationDecl::to(ENVIRONMENT, "stock_id")
                    .through(STOCK_ENVIRONMENT, "environment_id"),
            )
            .belongs_to_many(
                RelationDecl::to(STOCK_COLOR, "stock_id")
                    .through(STOCK_STOCK_COLOR, "stock_color_id"),
            ),
    );

    schema.insert(
        STOCK_COLOR,
        image_columns(EntityDescriptor::entity("stock_color"))
            .belongs_to(
                RelationDecl::to(STOCK, "stock_id")
                    .required()
                    .on_delete(OnDelete::Cascade),
            )
            .belongs_to(RelationDecl::to(COLOR_NAME, "color_name_id").required())
            .belongs_to_many(
                RelationDecl::to(COLOR_SCHEME, "stock_color_id")
                    .through(STOCK_COLOR_COLOR_SCHEME, "color_scheme_id"),
            ),
    );

    schema.insert(
        STOCK_MATERIAL,
        junction("stock_material", (STOCK, "stock_id"), (MATERIAL, "material_id")),
    );
    schema.insert(
        STOCK_DESIGN,
        junction("stock_design", (STOCK, "stock_id"), (DESIGN, "design_id")),
    );
    schema.insert(
        STOCK_ENVIRONMENT,
        junction(
            "stock_environment",
            (STOCK, "stock_id"),
            (ENVIRONMENT, "environment_id"),
        ),
    );
    schema.insert(
        STOCK_STOCK_COLOR,
        junction(
            "stock_stock_color",
            (STOCK, "stock_id"),
            (STOCK_COLOR, "stock_color_id"),
        ),
    );
    schema.insert(
        STOCK_COLOR_COLOR_SCHEME,
        junction(
            "stock_color_color_scheme",
            (STOCK_COLOR, "stock_color_id"),
            (COLOR_SCHEME, "color_scheme_id"),
        ),
    );

    schema
}
