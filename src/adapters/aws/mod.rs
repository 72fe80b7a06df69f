pub(crate) mod sts_client;
