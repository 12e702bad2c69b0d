pub mod config;
pub mod materializer;
pub mod orchestrator;
pub mod pr_template;
pub mod resolver;
pub mod sections;
pub mod synchronizer;
pub mod task_parser;
