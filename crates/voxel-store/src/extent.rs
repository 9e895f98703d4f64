use glam::UVec3;

pub fn box_volume(extent: &UVec3) -> usize {
    extent.to_array().iter().map(|&e| e as usize).product()
}

pub trait SubscriptToIndex<Size = Self> {
    fn to_index(&self, size: &Size) -> usize;
}

/// x varies fastest.
impl SubscriptToIndex for UVec3 {
    fn to_index(&self, size: &Self) -> usize {
        self.x as usize + size.x as usize * (self.y as usize + size.y as usize * self.z as usize)
    }
}
