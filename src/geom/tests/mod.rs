mod test_cusp_basic;
mod test_tube_basic;
