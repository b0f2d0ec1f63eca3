pub mod pubsub_client;
