mod loader_integration;
mod pipeline_integration;
