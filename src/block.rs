/*! Block implementation.

Blocks are the main building blocks of this crate. They each do one
thing, and you connect them together with streams to process the data.
*/
use crate::Result;

/** Return type for all blocks.

Lets the scheduler know whether more data could come out of this block, or
whether it should back off for a while before calling it again.
*/
#[derive(Debug, Clone)]
pub enum BlockRet {
    /// At least one sample was produced.
    Ok,

    /// Block didn't produce anything this time, but has a background
    /// process that may suddenly produce (e.g. waiting on a socket).
    Pending,

    /// Produced nothing, because there wasn't enough input.
    ///
    /// When all nodes in a graph produce either EOF or Noop, the graph is
    /// considered done, and `run()` returns.
    Noop,

    /// Produced nothing, because there wasn't enough room in an output
    /// stream. The scheduler should back off before retrying, to give the
    /// downstream block a chance to drain it.
    OutputFull,

    /// Block indicates that it will never produce more output.
    ///
    /// Examples:
    /// * Reading from a file, without repeating, and the file reached EOF.
    /// * A Head-style block reached its configured maximum.
    EOF,

    /// Internal state for two-phase done-detection in [`crate::mtgraph`].
    /// Never returned by a block implementation.
    InternalAwaiting,
}

/// Give a block a name, for logs and stats.
pub trait BlockName {
    /// Name of block.
    ///
    /// Not the name of the *instance* of the block, though it may include
    /// the type, e.g. `FileSource<Float>`.
    fn block_name(&self) -> &str;
}

/// Report EOF status.
pub trait BlockEOF {
    /// Return EOF status.
    ///
    /// Mutable because setting EOF may need to propagate to output
    /// streams.
    fn eof(&mut self) -> bool {
        false
    }
}

/// Block trait, that must be implemented for all blocks.
///
/// Simple blocks can use `#[derive(rustradio_macros::Block)]` to avoid
/// needing to implement `work()` by hand.
pub trait Block: BlockName {
    /// Block work function.
    ///
    /// A block implementation keeps track of its own inputs and outputs.
    fn work(&mut self) -> Result<BlockRet>;
}

/** Macro for one-for-one blocks whose output type is the same as the input.

The first argument is the block struct name. The rest are bounds that `T`
must satisfy.

`process_one(&self, s: T) -> T` must be implemented by the block.
*/
#[macro_export]
macro_rules! map_block_macro_v2 {
    ($name:path, $($tr:path), *) => {
        impl<T> $crate::block::BlockName for $name
        where
            T: Copy $(+$tr)*,
        {
            fn block_name(&self) -> &str {
                stringify!{$name}
            }
        }
        impl<T> $crate::block::Block for $name
        where
            T: Copy $(+$tr)*,
        {
            fn work(&mut self) -> $crate::Result<$crate::block::BlockRet> {
                let (i, tags) = self.src.read_buf()?;
                let mut o = self.dst.write_buf()?;

                let n = std::cmp::min(i.len(), o.len());
                if i.len() == 0 {
                    return Ok($crate::block::BlockRet::Noop);
                }
                if o.len() == 0 {
                    return Ok($crate::block::BlockRet::OutputFull);
                }

                for (place, ival) in o.slice().iter_mut().zip(i.iter()).take(n) {
                    *place = self.process_one(*ival);
                }

                o.produce(n, &tags);
                i.consume(n);
                Ok($crate::block::BlockRet::Ok)
            }
        }
    };
}

/** Macro for blocks whose output type differs from the input type.

`process_one(&self, s: Type1) -> Type2` must be implemented by the block.
*/
#[macro_export]
macro_rules! map_block_convert_macro {
    ($name:path, $out:ident) => {
        impl $crate::block::BlockName for $name {
            fn block_name(&self) -> &str {
                stringify! {$name}
            }
        }
        impl $crate::block::Block for $name {
            fn work(&mut self) -> $crate::Result<$crate::block::BlockRet> {
                let (i, tags) = self.src.read_buf()?;
                let mut o = self.dst.write_buf()?;

                let n = std::cmp::min(i.len(), o.len());
                if i.len() == 0 {
                    return Ok($crate::block::BlockRet::Noop);
                }
                if o.len() == 0 {
                    return Ok($crate::block::BlockRet::OutputFull);
                }

                for (place, ival) in o.slice().iter_mut().zip(i.iter()).take(n) {
                    *place = self.process_one(*ival);
                }

                o.produce(n, &tags);
                i.consume(n);
                Ok($crate::block::BlockRet::Ok)
            }
        }
    };
}

/** Version of [`map_block_convert_macro`] that lets the block rewrite tags.

`process_one(&mut self, s: Type1, tags: &[Tag]) -> (Type2, Vec<Tag>)` must be
implemented by the block.
*/
#[macro_export]
macro_rules! map_block_convert_tag_macro {
    ($name:path, $out:ident) => {
        impl $crate::block::BlockName for $name {
            fn block_name(&self) -> &str {
                stringify! {$name}
            }
        }
        impl $crate::block::Block for $name {
            fn work(&mut self) -> $crate::Result<$crate::block::BlockRet> {
                let (i, itags) = self.src.read_buf()?;
                let mut o = self.dst.write_buf()?;

                let n = std::cmp::min(i.len(), o.len());
                if i.len() == 0 {
                    return Ok($crate::block::BlockRet::Noop);
                }
                if o.len() == 0 {
                    return Ok($crate::block::BlockRet::OutputFull);
                }

                let mut otags = Vec::new();
                for (n, ival) in i.iter().take(n).enumerate() {
                    let here: Vec<_> = itags.iter().filter(|t| t.pos() == n).cloned().collect();
                    let (t, tags) = self.process_one(*ival, &here);
                    o.slice()[n] = t;
                    for tag in tags {
                        otags.push($crate::stream::Tag::new(n, tag.key(), tag.val().clone()));
                    }
                }

                o.produce(n, &otags);
                i.consume(n);
                Ok($crate::block::BlockRet::Ok)
            }
        }
    };
}
