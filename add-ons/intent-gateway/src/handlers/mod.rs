pub(crate) mod intent;
