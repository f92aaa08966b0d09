// Platform integrations backed by native or Python model runtimes

pub mod pose;
