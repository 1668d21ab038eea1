pub mod const_rng;
