//! Table layout for the `food_nutritions` relation

/// Relation name
pub const TABLE: &str = "food_nutritions";

/// Data columns in bind order; `id` is store-assigned and listed separately
pub const COLUMNS: [&str; 16] = [
    "food_cd",
    "group_name",
    "food_name",
    "research_year",
    "maker_name",
    "ref_name",
    "serving_size",
    "calorie",
    "carbohydrate",
    "protein",
    "fat",
    "sugars",
    "salt",
    "cholesterol",
    "saturated_fatty_acids",
    "trans_fat",
];

/// Idempotent DDL, applied in order
pub const DDL: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS food_nutritions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        food_cd TEXT NOT NULL,
        group_name TEXT,
        food_name TEXT NOT NULL,
        research_year TEXT,
        maker_name TEXT,
        ref_name TEXT,
        serving_size REAL,
        calorie REAL,
        carbohydrate REAL,
        protein REAL,
        fat REAL,
        sugars REAL,
        salt REAL,
        cholesterol REAL,
        saturated_fatty_acids REAL,
        trans_fat REAL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS ix_food_nutritions_food_cd ON food_nutritions(food_cd)",
    "CREATE INDEX IF NOT EXISTS ix_food_nutritions_food_name ON food_nutritions(food_name)",
    "CREATE INDEX IF NOT EXISTS ix_food_nutritions_research_year ON food_nutritions(research_year)",
    "CREATE INDEX IF NOT EXISTS ix_food_nutritions_maker_name ON food_nutritions(maker_name)",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_column_is_declared() {
        for column in COLUMNS {
            assert!(DDL[0].contains(&format!("{} ", column)), "missing {}", column);
        }
    }
}
