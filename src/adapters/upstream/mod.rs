pub(crate) mod http_transport;
