pub mod error;
pub mod net;
pub mod topo;
pub mod trace;

#[cfg(test)]
mod test;
