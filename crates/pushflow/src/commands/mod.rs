pub mod build;
pub mod detect;
pub mod run;
