pub mod salvo_config;
