use alloc::string::String;
use alloc::vec::Vec;

use super::SerialValue;
use crate::SerialResult;
use crate::engine::Serializer;

macro_rules! impl_serial_primitive {
    ($($ty:ty => $add:ident),* $(,)?) => {
        $(
            impl SerialValue for $ty {
                #[inline]
                fn transfer(&mut self, s: &mut Serializer<'_>) -> SerialResult<()> {
                    s.$add(self)
                }
            }
        )*
    };
}

impl_serial_primitive! {
    bool => add_bool,
    u8 => add_u8,
    i8 => add_i8,
    u16 => add_u16,
    i16 => add_i16,
    u32 => add_u32,
    i32 => add_i32,
    u64 => add_u64,
    i64 => add_i64,
    u128 => add_u128,
    i128 => add_i128,
    f32 => add_f32,
    f64 => add_f64,
    char => add_char,
    String => add_text,
}

impl<T: SerialValue> SerialValue for Vec<T> {
    fn transfer(&mut self, s: &mut Serializer<'_>) -> SerialResult<()> {
        s.add_list(self, |s, item| item.transfer(s))
    }
}
