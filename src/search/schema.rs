use tantivy::schema::{Field, Schema, FAST, STORED, TEXT};

/// Fields of the in-memory lexical index
#[derive(Clone)]
pub struct RecipeSchema {
    pub schema: Schema,
    pub id: Field,
    pub name: Field,
    pub description: Field,
    pub tags: Field,
    pub cuisine: Field,
}

impl RecipeSchema {
    pub fn new() -> Self {
        let mut schema_builder = Schema::builder();

        // Recipe ID (stored, not searchable)
        let id = schema_builder.add_i64_field("id", STORED | FAST);

        // Name (searchable, stored for exact-match and trigram scoring)
        let name = schema_builder.add_text_field("name", TEXT | STORED);

        let description = schema_builder.add_text_field("description", TEXT);

        // Tags (one value per tag)
        let tags = schema_builder.add_text_field("tags", TEXT);

        let cuisine = schema_builder.add_text_field("cuisine", TEXT);

        let schema = schema_builder.build();

        Self {
            schema,
            id,
            name,
            description,
            tags,
            cuisine,
        }
    }

    /// Searchable text fields with their query boosts
    pub fn weighted_fields(&self) -> [(Field, f32); 4] {
        [
            (self.name, 3.0),
            (self.tags, 2.0),
            (self.cuisine, 2.0),
            (self.description, 1.0),
        ]
    }
}

impl Default for RecipeSchema {
    fn default() -> Self {
        Self::new()
    }
}
