pub mod matching;
pub mod normalize;
pub mod substitution;

pub use matching::{
    IngredientMatch, IngredientMatchResult, IngredientMatcher, MatchConfig, MatchOptions,
    MissingIngredient, SortMode, StaplePolicy,
};
pub use normalize::IngredientNormalizer;
pub use substitution::{SubstitutionMatch, SubstitutionResolver, SubstitutionRule};
