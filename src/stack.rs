//! The stack the script engine operates on.

use crate::error::Error;
use crate::num;
use crate::MAX_SCRIPT_ELEMENT_SIZE;

/// A LIFO of byte strings. The most recently pushed element is the top.
///
/// Index 0 refers to the top element in all peek operations, and every
/// operation fails with [`Error::Underflow`] if it demands more elements than
/// are present.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stack {
    stk: Vec<Vec<u8>>,
}

impl Stack {
    /// Returns a new empty stack.
    pub fn new() -> Stack {
        Stack { stk: Vec::new() }
    }

    /// The number of elements on the stack.
    pub fn depth(&self) -> usize {
        self.stk.len()
    }

    /// Adds the given element to the top of the stack.
    pub fn push_byte_array(&mut self, so: Vec<u8>) -> Result<(), Error> {
        if so.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(Error::ElementTooBig);
        }
        self.stk.push(so);
        Ok(())
    }

    /// Encodes the provided value and pushes it onto the stack.
    pub fn push_int(&mut self, val: i64) -> Result<(), Error> {
        self.push_byte_array(num::serialize(val))
    }

    /// Encodes the provided boolean and pushes it onto the stack.
    pub fn push_bool(&mut self, val: bool) -> Result<(), Error> {
        self.push_byte_array(num::from_bool(val))
    }

    /// Removes and returns the top element.
    pub fn pop_byte_array(&mut self) -> Result<Vec<u8>, Error> {
        self.stk.pop().ok_or(Error::Underflow)
    }

    /// Removes the top element and decodes it as a script number.
    pub fn pop_int(&mut self) -> Result<i64, Error> {
        let so = self.pop_byte_array()?;
        num::parse(&so)
    }

    /// Removes the top element and interprets it as a boolean.
    pub fn pop_bool(&mut self) -> Result<bool, Error> {
        let so = self.pop_byte_array()?;
        Ok(num::cast_to_bool(&so))
    }

    /// Returns the element `idx` entries back from the top without removing it.
    pub fn peek_byte_array(&self, idx: usize) -> Result<&[u8], Error> {
        let sz = self.stk.len();
        if idx >= sz {
            return Err(Error::Underflow);
        }
        Ok(&self.stk[sz - idx - 1])
    }

    /// Decodes the element `idx` entries back from the top as a script number.
    pub fn peek_int(&self, idx: usize) -> Result<i64, Error> {
        num::parse(self.peek_byte_array(idx)?)
    }

    /// Interprets the element `idx` entries back from the top as a boolean.
    pub fn peek_bool(&self, idx: usize) -> Result<bool, Error> {
        Ok(num::cast_to_bool(self.peek_byte_array(idx)?))
    }

    /// Removes the element `idx` entries back from the top and returns it.
    ///
    /// `nip_n(0)` is equivalent to popping, `nip_n(1)` implements OP_NIP.
    pub fn nip_n(&mut self, idx: usize) -> Result<Vec<u8>, Error> {
        let sz = self.stk.len();
        if idx >= sz {
            return Err(Error::Underflow);
        }
        Ok(self.stk.remove(sz - idx - 1))
    }

    /// Removes the top `n` elements.
    pub fn drop_n(&mut self, n: usize) -> Result<(), Error> {
        if n < 1 {
            return Err(Error::InvalidArgs);
        }
        for _ in 0..n {
            self.pop_byte_array()?;
        }
        Ok(())
    }

    /// Duplicates the top `n` elements in order: `(x1 x2 -- x1 x2 x1 x2)`.
    pub fn dup_n(&mut self, n: usize) -> Result<(), Error> {
        if n < 1 {
            return Err(Error::InvalidArgs);
        }
        // Peeking at n-1 keeps yielding the next original element as each
        // copy is pushed.
        for _ in 0..n {
            let so = self.peek_byte_array(n - 1)?.to_vec();
            self.push_byte_array(so)?;
        }
        Ok(())
    }

    /// Copies the `n` elements `n` entries back to the top:
    /// `(x1 x2 x3 x4 -- x1 x2 x3 x4 x1 x2)` for n=2.
    pub fn over_n(&mut self, n: usize) -> Result<(), Error> {
        if n < 1 {
            return Err(Error::InvalidArgs);
        }
        // The depth of the entry stays fixed as the pushes grow the stack.
        let entry = 2 * n - 1;
        for _ in 0..n {
            let so = self.peek_byte_array(entry)?.to_vec();
            self.push_byte_array(so)?;
        }
        Ok(())
    }

    /// Rotates the top `3n` elements upwards by `n`:
    /// `(x1 x2 x3 -- x2 x3 x1)` for n=1.
    pub fn rot_n(&mut self, n: usize) -> Result<(), Error> {
        if n < 1 {
            return Err(Error::InvalidArgs);
        }
        let entry = 3 * n - 1;
        for _ in 0..n {
            let so = self.nip_n(entry)?;
            self.push_byte_array(so)?;
        }
        Ok(())
    }

    /// Swaps the top `n` elements with the `n` below them:
    /// `(x1 x2 x3 x4 -- x3 x4 x1 x2)` for n=2.
    pub fn swap_n(&mut self, n: usize) -> Result<(), Error> {
        if n < 1 {
            return Err(Error::InvalidArgs);
        }
        let entry = 2 * n - 1;
        for _ in 0..n {
            let so = self.nip_n(entry)?;
            self.push_byte_array(so)?;
        }
        Ok(())
    }

    /// Copies the top `n` elements to before the `2n`th entry:
    /// `(x1 x2 -- x2 x1 x2)` for n=1.
    pub fn tuck_n(&mut self, n: usize) -> Result<(), Error> {
        if n < 1 {
            return Err(Error::InvalidArgs);
        }
        let sz = self.stk.len();
        if sz < 2 * n {
            return Err(Error::Underflow);
        }
        let copies: Vec<Vec<u8>> = self.stk[sz - n..].to_vec();
        let at = sz - 2 * n;
        self.stk.splice(at..at, copies);
        Ok(())
    }

    /// Copies the element `idx` entries back to the top of the stack.
    pub fn pick_n(&mut self, idx: usize) -> Result<(), Error> {
        let so = self.peek_byte_array(idx)?.to_vec();
        self.push_byte_array(so)
    }

    /// Moves the element `idx` entries back to the top of the stack.
    pub fn roll_n(&mut self, idx: usize) -> Result<(), Error> {
        let so = self.nip_n(idx)?;
        self.push_byte_array(so)
    }

    /// Returns the contents bottom-up, so the last item is the top of the
    /// stack.
    pub(crate) fn as_items(&self) -> Vec<Vec<u8>> {
        self.stk.clone()
    }

    /// Replaces the contents with `items`, where the last item becomes the
    /// top of the stack.
    pub(crate) fn set_items(&mut self, items: Vec<Vec<u8>>) {
        self.stk = items;
    }
}
