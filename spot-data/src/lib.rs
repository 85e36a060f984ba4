pub mod dataset; // annotated spot-level data container
