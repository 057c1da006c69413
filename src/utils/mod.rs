// Utility functions
pub mod text;
pub mod validation;
