use std::path::Path;

pub fn indicies_to_flags(indicies: &[usize], len: usize) -> Vec<bool> {
  let mut flags = vec![false; len];
  indicies.iter().for_each(|&i| flags[i] = true);
  flags
}

pub fn sparse_to_dense_data<T>(sparse: Vec<(usize, T)>, len: usize) -> Vec<Option<T>> {
  let mut dense = Vec::from_iter((0..len).map(|_| None));
  sparse.into_iter().for_each(|(i, t)| dense[i] = Some(t));
  dense
}

pub fn save_vector(mu: &na::DVector<f64>, path: impl AsRef<Path>) -> std::io::Result<()> {
  use std::io::Write;
  let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
  for v in mu.iter() {
    writeln!(file, "{v}")?;
  }
  file.flush()
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn dense_data_keeps_positions() {
    let dense = sparse_to_dense_data(vec![(2, 'a'), (0, 'b')], 4);
    assert_eq!(dense, vec![Some('b'), None, Some('a'), None]);
    assert_eq!(indicies_to_flags(&[1, 3], 4), vec![false, true, false, true]);
  }
}
